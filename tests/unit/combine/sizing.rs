use super::*;

fn r(w: u32, h: u32) -> Resolution {
    Resolution::new(w, h)
}

#[test]
fn all_placeholders_default_to_4x4() {
    assert_eq!(negotiate_resolution([r(1, 1); 4]), r(4, 4));
    assert_eq!(negotiate_resolution([r(4, 4), r(2, 3), r(1, 1), r(4, 1)]), r(4, 4));
}

#[test]
fn single_real_image_wins_in_any_slot() {
    let big = r(256, 256);
    let fb = r(1, 1);
    for slot in 0..4 {
        let mut sizes = [fb; 4];
        sizes[slot] = big;
        assert_eq!(negotiate_resolution(sizes), big, "slot {slot}");
    }
}

#[test]
fn smallest_qualifying_dimension_per_axis() {
    assert_eq!(
        negotiate_resolution([r(512, 512), r(128, 128), r(1, 1), r(1, 1)]),
        r(128, 128)
    );
    assert_eq!(
        negotiate_resolution([r(512, 128), r(128, 512), r(1, 1), r(1, 1)]),
        r(128, 128)
    );
}

#[test]
fn axes_vote_independently() {
    // A 64x2 strip votes on width only.
    assert_eq!(negotiate_resolution([r(64, 2), r(1, 1)]), r(64, 4));
    assert_eq!(negotiate_resolution([r(64, 2), r(200, 32)]), r(64, 32));
    assert_eq!(negotiate_resolution([r(5, 5)]), r(5, 5));
}
