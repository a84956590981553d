use eventdesk_core::datetime::{canonical_from_local, local_from_canonical};
use eventdesk_core::reorder::{move_item, placement_for, reorder_body, DropPlacement};
use eventdesk_core::search::{BlockEntry, SHORT_QUERY_HINT};
use eventdesk_core::{plan_search, ReorderKind, SearchMode, StationEntry};
use serde_json::json;

#[test]
fn kitchen_query_shows_the_kitchen_station_expanded() {
    let stations = vec![
        StationEntry {
            text: "Kitchen".into(),
            blocks: vec![BlockEntry {
                text: "Sat 9:00 AM - 10:00 AM".into(),
                reservations: vec!["Ann Lee".into(), "Bo Diaz".into()],
            }],
        },
        StationEntry {
            text: "Parking".into(),
            blocks: vec![BlockEntry {
                text: "Sat 9:00 AM - 10:00 AM".into(),
                reservations: vec!["Cy Park".into()],
            }],
        },
    ];
    let SearchMode::Active(plan) = plan_search("kitchen", &stations) else {
        panic!("kitchen should activate the filter");
    };
    let kitchen = &plan.stations[0];
    assert!(kitchen.visible && kitchen.expand && kitchen.whole);
    assert!(kitchen.blocks.iter().all(|block| block.visible && block.expand));
    assert_eq!(kitchen.blocks[0].reservations, vec![true, true]);
    assert!(!plan.stations[1].visible);
    assert!(!plan.status().is_empty());

    assert_eq!(
        plan_search("xy", &stations),
        SearchMode::Inactive {
            hint: Some(SHORT_QUERY_HINT)
        }
    );
    assert!(SHORT_QUERY_HINT.contains("at least 3 characters"));
}

#[test]
fn dragging_c_to_the_top_posts_c_a_b() {
    let mut order: Vec<String> = ["A", "B", "C"].iter().map(|id| id.to_string()).collect();
    // cursor in the upper half of A
    let placement = placement_for(102.0, 100.0, 40.0);
    assert_eq!(placement, DropPlacement::Before);
    assert!(move_item(&mut order, "C", "A", placement));
    assert_eq!(
        reorder_body(ReorderKind::Stations, &order),
        json!({"order": [
            {"station_id": "C", "station_order": 0},
            {"station_id": "A", "station_order": 1},
            {"station_id": "B", "station_order": 2}
        ]})
    );
    assert_eq!(
        ReorderKind::Stations.endpoint("9"),
        "/admin/event/9/stations/reorder"
    );
}

#[test]
fn canonical_round_trip_is_identity() {
    for canonical in [
        "2025-01-01 00:00",
        "2025-06-01 09:30",
        "2024-02-29 23:59",
        "1999-12-31 12:00",
    ] {
        let local = local_from_canonical(canonical).expect("local form");
        assert_eq!(canonical_from_local(&local).as_deref(), Some(canonical));
    }
}
