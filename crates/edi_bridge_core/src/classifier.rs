use crate::contract::{FilteredKey, GroupedEventKeys, KeyToProcess, NotificationRecord};

pub const INBOUND_DIRECTORY: &str = "inbound";
pub const FOLDER_REASON: &str = "key represents a folder";
pub const NOT_INBOUND_REASON: &str = "key does not match an item in an `inbound` directory";

/// Why a notification key was excluded from processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    Folder,
    NotInboundItem,
}

impl FilterReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folder => FOLDER_REASON,
            Self::NotInboundItem => NOT_INBOUND_REASON,
        }
    }
}

/// Checks a single key; first matching rule wins.
pub fn classify_key(key: &str) -> Option<FilterReason> {
    if key.ends_with('/') {
        return Some(FilterReason::Folder);
    }

    let segments: Vec<&str> = key.split('/').collect();
    if segments.len() < 2 || segments[segments.len() - 2] != INBOUND_DIRECTORY {
        return Some(FilterReason::NotInboundItem);
    }

    None
}

/// Partitions notification records into keys to process and filtered keys.
///
/// Every record lands in exactly one of the two outputs, and input order is
/// preserved within each.
pub fn group_event_keys(records: &[NotificationRecord]) -> GroupedEventKeys {
    let mut grouped = GroupedEventKeys::default();

    for record in records {
        let key = record.key();
        match classify_key(key) {
            Some(reason) => grouped.filtered_keys.push(FilteredKey {
                key: key.to_string(),
                reason: reason.as_str().to_string(),
            }),
            None => grouped.keys_to_process.push(KeyToProcess {
                bucket_name: record.bucket_name().to_string(),
                key: key.to_string(),
            }),
        }
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(keys: &[&str]) -> Vec<NotificationRecord> {
        keys.iter()
            .map(|key| NotificationRecord::new("sftp-bucket", *key))
            .collect()
    }

    #[test]
    fn accepts_item_directly_under_inbound_directory() {
        let grouped = group_event_keys(&records(&["trading_partners/acme/inbound/850.edi"]));

        assert!(grouped.filtered_keys.is_empty());
        assert_eq!(
            grouped.keys_to_process,
            vec![KeyToProcess {
                bucket_name: "sftp-bucket".to_string(),
                key: "trading_partners/acme/inbound/850.edi".to_string(),
            }]
        );
    }

    #[test]
    fn folder_check_wins_over_directory_check() {
        assert_eq!(classify_key("inbound/"), Some(FilterReason::Folder));
        assert_eq!(
            classify_key("trading_partners/acme/inbound/"),
            Some(FilterReason::Folder)
        );
        assert_eq!(classify_key("/"), Some(FilterReason::Folder));
    }

    #[test]
    fn rejects_items_outside_an_inbound_directory() {
        for key in [
            "850.edi",
            "trading_partners/acme/outbound/850.edi",
            "inbound/nested/850.edi",
            "trading_partners/acme/Inbound/850.edi",
            "",
        ] {
            assert_eq!(
                classify_key(key),
                Some(FilterReason::NotInboundItem),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn minimal_two_segment_key_is_accepted() {
        assert_eq!(classify_key("inbound/850.edi"), None);
    }

    #[test]
    fn every_key_lands_in_exactly_one_bucket() {
        let keys = [
            "trading_partners/acme/inbound/1.edi",
            "trading_partners/acme/inbound/",
            "trading_partners/acme/outbound/2.edi",
            "inbound/3.edi",
            "loose.edi",
            "trading_partners/acme/inbound/1.edi",
        ];
        let grouped = group_event_keys(&records(&keys));

        assert_eq!(
            grouped.filtered_keys.len() + grouped.keys_to_process.len(),
            keys.len()
        );

        let mut seen: Vec<&str> = grouped
            .filtered_keys
            .iter()
            .map(|filtered| filtered.key.as_str())
            .chain(grouped.keys_to_process.iter().map(|item| item.key.as_str()))
            .collect();
        let mut expected = keys.to_vec();
        seen.sort_unstable();
        expected.sort_unstable();
        assert_eq!(seen, expected);

        assert_eq!(
            grouped
                .keys_to_process
                .iter()
                .map(|item| item.key.as_str())
                .collect::<Vec<_>>(),
            vec![
                "trading_partners/acme/inbound/1.edi",
                "inbound/3.edi",
                "trading_partners/acme/inbound/1.edi",
            ]
        );
        assert_eq!(grouped.filtered_keys[0].reason, FOLDER_REASON);
        assert_eq!(grouped.filtered_keys[1].reason, NOT_INBOUND_REASON);
    }
}
