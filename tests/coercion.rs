mod common;

use json_bind::{BindErrorKind, Rule, RuleSet, bindable, from_str};

bindable! {
    #[derive(Debug, Default, PartialEq)]
    struct Scalars {
        small: u8,
        signed: i16,
        big: u64,
        ratio: f64,
        single: f32,
        flag: bool,
        label: String,
        maybe: Option<i32>,
        tags: Vec<String>,
        scores: Vec<u32>,
    }
}

fn rules() -> RuleSet {
    RuleSet::new([
        Rule::bind_type::<Scalars>("").unwrap(),
        Rule::bind_field::<Scalars>("small", "small").unwrap(),
        Rule::bind_field::<Scalars>("signed", "signed").unwrap(),
        Rule::bind_field::<Scalars>("big", "big").unwrap(),
        Rule::bind_field::<Scalars>("ratio", "ratio").unwrap(),
        Rule::bind_field::<Scalars>("single", "single").unwrap(),
        Rule::bind_field::<Scalars>("flag", "flag").unwrap(),
        Rule::bind_field::<Scalars>("label", "label").unwrap(),
        Rule::bind_field::<Scalars>("maybe", "maybe").unwrap(),
        Rule::bind_field::<Scalars>("tags", "tags").unwrap(),
        Rule::bind_field::<Scalars>("scores[]", "scores").unwrap(),
    ])
    .unwrap()
}

fn bind(json: &str) -> Scalars {
    common::init_logging();
    from_str(json, &rules()).unwrap()
}

fn bind_err(json: &str) -> BindErrorKind {
    from_str::<Scalars>(json, &rules()).unwrap_err().kind
}

#[test]
fn every_scalar_kind() {
    let scalars = bind(
        r#"{
            "small": 255,
            "signed": -300,
            "big": 18446744073709551615,
            "ratio": 0.5,
            "single": 1.5,
            "flag": true,
            "label": "café \"quoted\"",
            "maybe": 7,
            "tags": ["a", "b"],
            "scores": [1, 2, 3]
        }"#,
    );
    assert_eq!(
        scalars,
        Scalars {
            small: 255,
            signed: -300,
            big: u64::MAX,
            ratio: 0.5,
            single: 1.5,
            flag: true,
            label: "café \"quoted\"".into(),
            maybe: Some(7),
            tags: vec!["a".into(), "b".into()],
            scores: vec![1, 2, 3],
        }
    );
}

#[test]
fn integral_floats_fit_integer_fields() {
    let scalars = bind(r#"{"small": 3.0, "big": 1e3}"#);
    assert_eq!(scalars.small, 3);
    assert_eq!(scalars.big, 1000);
}

#[test]
fn fractional_number_into_integer_is_a_mismatch() {
    assert_eq!(
        bind_err(r#"{"small": 2.5}"#),
        BindErrorKind::TypeMismatch {
            path: "small".into(),
            expected: "u8".into(),
            got: "number with fractional part",
        }
    );
}

#[test]
fn out_of_range_integers() {
    assert_eq!(
        bind_err(r#"{"small": 256}"#),
        BindErrorKind::NumberOutOfRange {
            path: "small".into(),
            value: "256".into(),
            target: "u8".into(),
        }
    );
    assert_eq!(
        bind_err(r#"{"signed": -40000}"#),
        BindErrorKind::NumberOutOfRange {
            path: "signed".into(),
            value: "-40000".into(),
            target: "i16".into(),
        }
    );
    assert!(matches!(
        bind_err(r#"{"big": -1}"#),
        BindErrorKind::NumberOutOfRange { .. }
    ));
}

#[test]
fn floats_accept_integers() {
    let scalars = bind(r#"{"ratio": 2, "single": -4}"#);
    assert_eq!(scalars.ratio, 2.0);
    assert_eq!(scalars.single, -4.0);
}

#[test]
fn kinds_must_match() {
    assert_eq!(
        bind_err(r#"{"label": true}"#),
        BindErrorKind::TypeMismatch {
            path: "label".into(),
            expected: "String".into(),
            got: "boolean",
        }
    );
    assert_eq!(
        bind_err(r#"{"flag": "yes"}"#),
        BindErrorKind::TypeMismatch {
            path: "flag".into(),
            expected: "bool".into(),
            got: "string",
        }
    );
    assert_eq!(
        bind_err(r#"{"label": []}"#),
        BindErrorKind::TypeMismatch {
            path: "label".into(),
            expected: "String".into(),
            got: "array",
        }
    );
    assert_eq!(
        bind_err(r#"{"tags": "a"}"#),
        BindErrorKind::TypeMismatch {
            path: "tags".into(),
            expected: "Vec<String>".into(),
            got: "string",
        }
    );
}

#[test]
fn sequence_element_mismatch_names_the_index() {
    assert_eq!(
        bind_err(r#"{"scores": [1, "two"]}"#),
        BindErrorKind::TypeMismatch {
            path: "scores[1]".into(),
            expected: "u32".into(),
            got: "string",
        }
    );
}

bindable! {
    #[derive(Debug, PartialEq)]
    struct Seeded {
        name: String,
        limit: Option<u32>,
        tags: Vec<String>,
        aliases: Vec<String>,
    }
}

impl Default for Seeded {
    fn default() -> Self {
        Seeded {
            name: "unnamed".into(),
            limit: Some(10),
            tags: vec!["seed".into()],
            aliases: vec!["seed".into()],
        }
    }
}

fn seeded_rules() -> RuleSet {
    RuleSet::new([
        Rule::bind_type::<Seeded>("").unwrap(),
        Rule::bind_field::<Seeded>("name", "name").unwrap(),
        Rule::bind_field::<Seeded>("limit", "limit").unwrap(),
        Rule::bind_field::<Seeded>("tags[]", "tags").unwrap(),
        Rule::bind_field::<Seeded>("aliases", "aliases").unwrap(),
    ])
    .unwrap()
}

#[test]
fn absent_keys_keep_defaults() {
    let seeded: Seeded = from_str("{}", &seeded_rules()).unwrap();
    assert_eq!(seeded, Seeded::default());
}

#[test]
fn null_resets_fields() {
    let seeded: Seeded = from_str(
        r#"{"name": null, "limit": null, "aliases": null}"#,
        &seeded_rules(),
    )
    .unwrap();
    assert_eq!(seeded.name, "");
    assert_eq!(seeded.limit, None);
    assert!(seeded.aliases.is_empty());
}

#[test]
fn arrays_replace_default_contents() {
    let seeded: Seeded = from_str(
        r#"{"tags": ["x", "y"], "aliases": ["z"]}"#,
        &seeded_rules(),
    )
    .unwrap();
    assert_eq!(seeded.tags, ["x", "y"]);
    assert_eq!(seeded.aliases, ["z"]);

    let emptied: Seeded = from_str(r#"{"tags": []}"#, &seeded_rules()).unwrap();
    assert!(emptied.tags.is_empty());
}

#[test]
fn floats_too_large_for_f32_are_out_of_range() {
    assert_eq!(
        bind_err(r#"{"single": 1e300}"#),
        BindErrorKind::NumberOutOfRange {
            path: "single".into(),
            value: "1e300".into(),
            target: "f32".into(),
        }
    );
    assert_eq!(bind(r#"{"ratio": 1e300}"#).ratio, 1e300);
}
