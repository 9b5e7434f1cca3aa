use kdp_assembly::*;

#[test]
fn test_premium_color_square_book() {
    let policy = PolicyTable::kdp_default();
    let spine = SpineCalculator::new(&policy)
        .spine_width("premium-color", 24)
        .unwrap();
    assert_eq!(spine, 0.0563);

    let trim = policy.trim_format("8.5x8.5").unwrap();
    let cover = TrimGeometryResolver::new(&policy).cover(trim, spine);
    assert_eq!(cover.canvas_width_in, 17.3063);
    assert_eq!(cover.canvas_height_in, 8.75);
}

#[test]
fn test_spine_width_is_monotonic_and_follows_formula() {
    let policy = PolicyTable::kdp_default();
    let calc = SpineCalculator::new(&policy);
    let tolerance = 0.5 * 10f64.powi(-(policy.spine_precision_decimals as i32)) + 1e-12;

    for paper in &policy.paper_types {
        let mut previous = 0.0;
        for count in paper.min_pages..=paper.max_pages {
            let width = calc.spine_width_for(paper, count).unwrap();
            assert!(
                width >= previous,
                "{}: spine shrank at {} pages",
                paper.id,
                count
            );
            assert!((width - count as f64 * paper.spine_in_per_page).abs() <= tolerance);
            previous = width;
        }
    }
}

#[test]
fn test_canvas_width_identity_for_every_trim() {
    let policy = PolicyTable::kdp_default();
    let resolver = TrimGeometryResolver::new(&policy);
    let calc = SpineCalculator::new(&policy);
    let paper = policy.paper_type("white").unwrap();

    for trim in &policy.trim_formats {
        for count in [24, 100, 333, 828] {
            let spine = calc.spine_width_for(paper, count).unwrap();
            let cover = resolver.cover(trim, spine);
            let expected = 2.0 * trim.width_in + spine + 2.0 * policy.bleed_in;
            assert!(
                (cover.canvas_width_in - expected).abs() < 1e-9,
                "{} at {} pages",
                trim.id,
                count
            );
            assert!(
                (cover.canvas_height_in - (trim.height_in + 2.0 * policy.bleed_in)).abs() < 1e-9
            );
        }
    }
}

#[test]
fn test_page_count_out_of_range() {
    let policy = PolicyTable::kdp_default();
    let calc = SpineCalculator::new(&policy);
    assert!(matches!(
        calc.spine_width("standard-color", 71),
        Err(AssemblyError::PageCountOutOfRange {
            min_pages: 72,
            ..
        })
    ));
    assert!(matches!(
        calc.spine_width("no-such-paper", 100),
        Err(AssemblyError::UnknownPaperType(_))
    ));
}

#[test]
fn test_zones() {
    let policy = PolicyTable::kdp_default();
    let trim = policy.trim_format("6x9").unwrap();
    let cover = TrimGeometryResolver::new(&policy).cover(trim, 0.5);
    let zones = &cover.zones;

    // Safe interior is the canvas inset by bleed and safety margin
    assert_eq!(zones.safe_interior.x, 0.25);
    assert!((zones.safe_interior.width - (cover.canvas_width_in - 0.5)).abs() < 1e-9);

    // Trim line sits one bleed in from every edge
    assert_eq!(zones.trim_line.x, policy.bleed_in);
    assert_eq!(zones.trim_line.y, policy.bleed_in);

    // Spine text band spans exactly the spine
    assert_eq!(zones.spine_text.x, cover.spine_panel.x);
    assert_eq!(zones.spine_text.width, cover.spine_panel.width);

    // Barcode is on the back cover, clear of the spine
    assert!(zones.barcode.right() <= cover.spine_panel.x);
    assert!(cover.back_safe_area().contains(&zones.barcode));
}

#[test]
fn test_minimum_pixels_follow_required_dpi() {
    let policy = PolicyTable::kdp_default();
    let trim = policy.trim_format("6x9").unwrap();
    assert_eq!(
        TrimGeometryResolver::new(&policy).minimum_pixels(trim),
        (1800, 2700)
    );
}

#[test]
fn test_completion_plan() {
    let plan = PageCompletionPlanner::new(24).plan(3);
    assert_eq!(plan.real_pages, 3);
    assert_eq!(plan.filler_pages, 21);
    assert_eq!(plan.total_pages, 24);
    assert!(plan.filler_positions().all(|p| p >= 3));
}
