use kdp_assembly::*;

#[test]
fn test_default_policy_is_valid() {
    let policy = PolicyTable::kdp_default();
    policy.validate().unwrap();
    assert_eq!(policy.bleed_in, 0.125);
    assert_eq!(policy.required_dpi, 300);
    assert!(policy.paper_type("premium-color").is_ok());
    assert!(policy.trim_format("6x9").is_ok());
    assert!(policy.cover_profile().is_ok());
}

#[test]
fn test_lookup_errors() {
    let policy = PolicyTable::kdp_default();
    assert!(matches!(
        policy.paper_type("vellum"),
        Err(AssemblyError::UnknownPaperType(id)) if id == "vellum"
    ));
    assert!(matches!(
        policy.trim_format("3x3"),
        Err(AssemblyError::UnknownTrimFormat(_))
    ));
    assert!(policy.color_profile("nope").is_none());
}

#[test]
fn test_invalid_page_range_is_rejected() {
    let mut policy = PolicyTable::kdp_default();
    policy.paper_types[0].min_pages = 900;
    let json = serde_json::to_string(&policy).unwrap();
    assert!(matches!(
        PolicyTable::from_json_str(&json),
        Err(AssemblyError::InvalidPolicy(_))
    ));
}

#[test]
fn test_duplicate_ids_are_rejected() {
    let mut policy = PolicyTable::kdp_default();
    let copy = policy.trim_formats[0].clone();
    policy.trim_formats.push(copy);
    assert!(matches!(
        policy.validate(),
        Err(AssemblyError::InvalidPolicy(_))
    ));
}

#[test]
fn test_ink_limit_bounds() {
    let mut policy = PolicyTable::kdp_default();
    policy.color_profiles.push(ColorProfileSpec::new(
        "overinked",
        ColorProfileKind::Cmyk {
            total_ink_limit: 450,
            black: BlackGeneration::SingleInk,
        },
    ));
    assert!(policy.validate().is_err());
}

#[test]
fn test_malformed_json_is_an_error() {
    assert!(matches!(
        PolicyTable::from_json_str("{ \"bleed_in\": "),
        Err(AssemblyError::Json(_))
    ));
}

#[tokio::test]
async fn test_policy_save_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.json");

    let policy = PolicyTable::kdp_default().with_required_dpi(600);
    policy.save(&path).await.unwrap();
    let loaded = PolicyTable::load(&path).await.unwrap();
    assert_eq!(loaded, policy);
}

#[test]
fn test_barcode_spec_defaults_when_omitted() {
    let policy = PolicyTable::kdp_default();
    let mut value = serde_json::to_value(&policy).unwrap();
    value.as_object_mut().unwrap().remove("barcode");
    let parsed = PolicyTable::from_json_str(&value.to_string()).unwrap();
    assert_eq!(parsed.barcode, BarcodeSpec::default());
}
