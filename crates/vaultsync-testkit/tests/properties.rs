//! Property tests over the pure building blocks.

use proptest::prelude::*;
use serde_json::Value;
use vaultsync::core::{id_from_remote_key, merge_json, remote_key};
use vaultsync_testkit::generators::{payload, raw_id, resource_type, settings_doc};
use vaultsync_testkit::test_cipher;

fn tags(doc: &Value) -> Vec<String> {
    let mut tags: Vec<String> = doc["tags"]
        .as_array()
        .map(|tags| tags.iter().filter_map(|t| t.as_str().map(String::from)).collect())
        .unwrap_or_default();
    tags.sort();
    tags.dedup();
    tags
}

proptest! {
    #[test]
    fn sealed_payload_opens_to_original(data in payload(2048)) {
        let cipher = test_cipher();
        let sealed = cipher.encrypt(&data).unwrap();
        prop_assert!(cipher.looks_encrypted(&sealed));
        prop_assert_eq!(cipher.decrypt(&sealed).unwrap(), data);
    }

    #[test]
    fn remote_key_recovers_id(resource_type in resource_type(), id in raw_id()) {
        let key = remote_key(resource_type, &id);
        prop_assert_eq!(id_from_remote_key(resource_type, &key).unwrap(), Some(id));
    }

    #[test]
    fn settings_merge_unions_tags_and_keeps_local_mode(
        local in settings_doc(),
        remote in settings_doc(),
    ) {
        let merged: Value = serde_json::from_slice(&merge_json(
            local.to_string().as_bytes(),
            remote.to_string().as_bytes(),
        ))
        .unwrap();

        let mut expected = tags(&local);
        expected.extend(tags(&remote));
        expected.sort();
        expected.dedup();
        prop_assert_eq!(tags(&merged), expected);
        prop_assert_eq!(&merged["mode"], &local["mode"]);
    }

    #[test]
    fn settings_merge_tag_set_is_commutative(a in settings_doc(), b in settings_doc()) {
        let ab: Value = serde_json::from_slice(&merge_json(a.to_string().as_bytes(), b.to_string().as_bytes())).unwrap();
        let ba: Value = serde_json::from_slice(&merge_json(b.to_string().as_bytes(), a.to_string().as_bytes())).unwrap();
        prop_assert_eq!(tags(&ab), tags(&ba));
    }
}
