use super::*;
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::{NoContext, Timestamp, Uuid};

#[test]
fn test_new_ids_are_time_ordered() {
    assert_eq!(InventoryLotId::new().into_inner().get_version_num(), 7);

    // Lots received in the same instant fall back to id order for FIFO.
    let at = |secs| Uuid::new_v7(Timestamp::from_unix(NoContext, secs, 0));
    let earlier = InventoryLotId::from_uuid(at(1_735_689_600));
    let later = InventoryLotId::from_uuid(at(1_735_689_601));
    assert!(earlier < later);
}

#[test]
fn test_ids_order_by_uuid_in_sets() {
    let low = InventoryLotId::from_uuid(Uuid::from_u128(1));
    let high = InventoryLotId::from_uuid(Uuid::from_u128(2));
    let set: BTreeSet<_> = [high, low, high].into_iter().collect();
    assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![low, high]);
}

#[test]
fn test_display_is_the_bare_uuid_for_references() {
    let uuid = Uuid::from_u128(0x0193_0000_0000_7000_8000_0000_0000_002a);
    let rule = RecurringRuleId::from_uuid(uuid);
    assert_eq!(format!("REC-{rule}-20250228"), format!("REC-{uuid}-20250228"));
}

#[test]
fn test_parse_tenant_id_from_argument() {
    let tenant = TenantId::from_str("00000000-0000-0000-0000-000000000001").unwrap();
    assert_eq!(tenant.into_inner(), Uuid::from_u128(1));
    assert!("tenant-1".parse::<TenantId>().is_err());
}

#[test]
fn test_ids_serialize_as_plain_strings_inside_metadata() {
    let asset = AssetId::from_uuid(Uuid::from_u128(7));
    let journal = JournalId::from_uuid(Uuid::from_u128(8));
    let json = serde_json::json!({ "asset_id": asset, "voided_journal_id": journal });
    assert_eq!(json["asset_id"], "00000000-0000-0000-0000-000000000007");
    assert_eq!(json["voided_journal_id"], "00000000-0000-0000-0000-000000000008");

    let back: AssetId = serde_json::from_value(json["asset_id"].clone()).unwrap();
    assert_eq!(back, asset);
}
