//! Store plus derived engine on a toy strand

use caster_sim_core::derived::mirror_index;
use caster_sim_core::{FieldStore, FieldView, Geometry, PhaseThresholds, Slice, ViewScale};

#[ctor::ctor]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 2x2 quadrant, four slices of capacity
fn toy_geometry() -> Geometry {
    Geometry::new(2, 2, 4, 1, 1, 1).unwrap()
}

fn thresholds() -> PhaseThresholds {
    PhaseThresholds::new(1460.0, 1520.0)
}

/// Quadrant encoding its position: base + 10*row + col
fn positional(base: f32) -> Slice {
    Slice::from_fn(2, 2, |r, c| base + (10 * r + c) as f32)
}

#[test]
fn test_full_window_snapshot_faces() {
    let geometry = toy_geometry();
    let mut field = FieldStore::new(&geometry);
    for value in [1600.0, 1610.0, 1620.0, 1630.0] {
        field.add_first_uniform(value).unwrap();
    }

    let snapshot = FieldView::new(&field, &geometry, thresholds())
        .build_snapshot()
        .unwrap();

    assert!(snapshot.is_full);
    assert!(!snapshot.is_tail);
    assert_eq!((snapshot.start, snapshot.end), (0, 4));
    // Default scale keeps every row and every second column
    assert_eq!(snapshot.sides.up.len(), 4);
    assert_eq!(snapshot.sides.up[0].len(), 2);
    assert!(snapshot.sides.up.iter().flatten().all(|&t| t == 1630.0));
    assert!(snapshot.sides.down.iter().flatten().all(|&t| t == 1600.0));

    // Face rows for z = 3 and z = 1, i.e. first and third appended slices
    assert_eq!(snapshot.sides.front.len(), 2);
    assert_eq!(snapshot.sides.front[1], vec![1600.0, 1600.0]);
    assert_eq!(snapshot.sides.front[0], vec![1620.0, 1620.0]);
    assert_eq!(snapshot.sides.back, snapshot.sides.front);
    assert_eq!(snapshot.sides.left[0].len(), 4);
    assert_eq!(snapshot.sides.right, snapshot.sides.left);
}

#[test]
fn test_up_and_down_follow_mirroring_rule() {
    let geometry = toy_geometry();
    let mut field = FieldStore::new(&geometry);
    for base in [1600.0, 1700.0, 1800.0, 1900.0] {
        field.add_first(positional(base)).unwrap();
    }

    let snapshot = FieldView::new(&field, &geometry, thresholds())
        .with_scale(ViewScale { x: 1, y: 1, z: 1 })
        .build_snapshot()
        .unwrap();

    for (face, base) in [(&snapshot.sides.up, 1900.0), (&snapshot.sides.down, 1600.0)] {
        let dim = face.len();
        for r in 0..dim {
            for c in 0..dim {
                let expected = base + (10 * mirror_index(r, 2) + mirror_index(c, 2)) as f32;
                assert_eq!(face[r][c], expected);
                assert_eq!(face[r][c], face[dim - 1 - r][dim - 1 - c]);
            }
        }
    }
}

#[test]
fn test_window_bounds_after_eviction_and_tail() {
    let geometry = toy_geometry();
    let mut field = FieldStore::new(&geometry);
    for _ in 0..6 {
        field.add_first_uniform(1550.0).unwrap();
    }
    field.set_tail(true);
    field.remove_last().unwrap();

    let snapshot = FieldView::new(&field, &geometry, thresholds())
        .build_snapshot()
        .unwrap();
    assert!(snapshot.is_tail);
    assert!(!snapshot.is_full);
    assert_eq!((snapshot.start, snapshot.end), (3, 6));
}

#[test]
fn test_snapshot_wire_shape() {
    let geometry = toy_geometry();
    let mut field = FieldStore::new(&geometry);
    field.add_first_uniform(1550.0).unwrap();

    let snapshot = FieldView::new(&field, &geometry, thresholds())
        .build_snapshot()
        .unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();

    for key in ["x_scale", "y_scale", "z_scale", "start", "end", "is_full", "is_tail"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    for face in ["up", "down", "left", "right", "front", "back"] {
        assert!(json["sides"].get(face).is_some(), "missing face {face}");
    }
}

#[test]
fn test_slice_query_bounds_follow_field_size() {
    let geometry = toy_geometry();
    let mut field = FieldStore::new(&geometry);
    for _ in 0..3 {
        field.add_first_uniform(1600.0).unwrap();
    }
    let view = FieldView::new(&field, &geometry, thresholds());

    let info = view.slice_info(field.size() - 1).unwrap();
    assert_eq!(info.length, 3);
    // Whole section above both thresholds: fronts at the surface
    assert_eq!(info.vertical_solid_thickness, 0.0);
    assert_eq!(info.horizontal_liquid_thickness, 0.0);
    assert!(view.slice_info(field.size()).is_err());
}
