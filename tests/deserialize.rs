mod common;

use common::{Address, Example, PEOPLE_JSON, Person, example_set, init_logging, people};
use json_bind::{
    BindErrorKind, Deserializer, Options, Rule, RuleSet, bindable, deserialize, from_slice,
    from_str,
};

#[test]
fn binds_client_and_people() {
    init_logging();
    let json = r#"{"client":"Acme","people":[{"firstName":"Jo","age":30}]}"#;

    let example: Example = from_str(json, &example_set()).unwrap();
    assert_eq!(
        example,
        Example {
            client: "Acme".into(),
            people: vec![Person {
                first_name: "Jo".into(),
                age: Some(30),
                ..Person::default()
            }],
        }
    );
}

#[test]
fn binds_nested_objects_and_arrays_of_objects() {
    init_logging();
    let example: Example = from_str(PEOPLE_JSON, &example_set()).unwrap();
    assert_eq!(example, people());
}

#[test]
fn array_of_objects_keeps_document_order() {
    bindable! {
        #[derive(Debug, Default, PartialEq)]
        struct Bag {
            items: Vec<Item>,
        }

        #[derive(Debug, Default, PartialEq)]
        struct Item {
            x: i32,
        }
    }

    let rules = RuleSet::new([
        Rule::bind_type::<Bag>("").unwrap(),
        Rule::bind_type_into::<Item>("items[]", "items").unwrap(),
        Rule::bind_field::<Item>("items[].x", "x").unwrap(),
    ])
    .unwrap();

    let bag: Bag = from_str(r#"{"items":[{"x":1},{"x":2}]}"#, &rules).unwrap();
    assert_eq!(bag.items, vec![Item { x: 1 }, Item { x: 2 }]);

    let root = deserialize(br#"{"items":[{"x":1},{"x":2}]}"#, &rules).unwrap();
    insta::assert_snapshot!(format!("{root:?}"), @"Bag { items: [Item { x: 1 }, Item { x: 2 }] }");
}

#[test]
fn field_rule_on_element_path_constructs_elements() {
    bindable! {
        #[derive(Debug, Default, PartialEq)]
        struct Bag {
            items: Vec<Item>,
        }

        #[derive(Debug, Default, PartialEq)]
        struct Item {
            x: i32,
        }
    }

    let json = r#"{"items":[{"x":1},{"x":2}]}"#;
    let single = RuleSet::new([
        Rule::bind_type::<Bag>("").unwrap(),
        Rule::bind_field::<Bag>("items[]", "items").unwrap(),
        Rule::bind_field::<Item>("items[].x", "x").unwrap(),
    ])
    .unwrap();
    let bag: Bag = from_str(json, &single).unwrap();
    assert_eq!(bag.items, vec![Item { x: 1 }, Item { x: 2 }]);

    let paired = RuleSet::new([
        Rule::bind_type::<Bag>("").unwrap(),
        Rule::bind_field::<Bag>("items[]", "items").unwrap(),
        Rule::bind_type::<Item>("items[]").unwrap(),
        Rule::bind_field::<Item>("items[].x", "x").unwrap(),
    ])
    .unwrap();
    let bag: Bag = from_str(json, &paired).unwrap();
    assert_eq!(bag.items, vec![Item { x: 1 }, Item { x: 2 }]);
}

bindable! {
    #[derive(Debug, Default, PartialEq)]
    struct Org {
        members: Vec<Member>,
        flat: Vec<i64>,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Member {
        name: String,
    }
}

#[test]
fn nested_arrays_append_objects_across_outer_elements() {
    init_logging();
    let rules = RuleSet::new([
        Rule::bind_type::<Org>("").unwrap(),
        Rule::bind_type_into::<Member>("groups[].members[]", "members").unwrap(),
        Rule::bind_field::<Member>("groups[].members[].name", "name").unwrap(),
    ])
    .unwrap();

    let org: Org = from_str(
        r#"{"groups":[{"members":[{"name":"a"},{"name":"b"}]},{"members":[{"name":"c"}]}]}"#,
        &rules,
    )
    .unwrap();
    let names: Vec<_> = org.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn nested_arrays_append_scalars_across_outer_elements() {
    let rules = RuleSet::new([
        Rule::bind_type::<Org>("").unwrap(),
        Rule::bind_field::<Org>("matrix[][]", "flat").unwrap(),
    ])
    .unwrap();

    let org: Org = from_str(r#"{"matrix":[[1,2],[],[3]]}"#, &rules).unwrap();
    assert_eq!(org.flat, [1, 2, 3]);
}

#[test]
fn unmapped_content_is_skipped() {
    init_logging();
    let rules = example_set();
    let plain = r#"{"client":"Acme","people":[{"firstName":"Jo","age":30}]}"#;
    let noisy = r#"{
        "version": 3,
        "client": "Acme",
        "tags": ["a", {"b": [1, 2, 3]}],
        "people": [
            {"firstName": "Jo", "nickname": "J", "age": 30, "extra": {"deep": [null]}}
        ],
        "trailer": null
    }"#;

    let plain: Example = from_str(plain, &rules).unwrap();
    let noisy: Example = from_str(noisy, &rules).unwrap();
    assert_eq!(plain, noisy);
}

#[test]
fn repeated_calls_agree() {
    let rules = example_set();
    let first: Example = from_str(PEOPLE_JSON, &rules).unwrap();
    let second: Example = from_str(PEOPLE_JSON, &rules).unwrap();
    assert_eq!(first, second);
}

#[test]
fn dynamic_entry_point_returns_root_instance() {
    let rules = example_set();
    let root = deserialize(PEOPLE_JSON.as_bytes(), &rules).unwrap();

    assert!(root.is::<Example>());
    assert_eq!(root.shape().type_identifier, "Example");
    let example = root.downcast_ref::<Example>().unwrap();
    assert_eq!(example.people.len(), 2);
    assert_eq!(root.downcast::<Example>().unwrap(), people());
}

#[test]
fn from_slice_binds_bytes() {
    let example: Example = from_slice(PEOPLE_JSON.as_bytes(), &example_set()).unwrap();
    assert_eq!(example, people());
}

#[test]
fn byte_order_mark_is_ignored() {
    let json = "\u{feff}{\"client\": \"hi!\"}";
    let example: Example = from_str(json, &example_set()).unwrap();
    assert_eq!(example.client, "hi!");
}

#[test]
fn root_array_fills_sequence_on_root() {
    bindable! {
        #[derive(Debug, Default, PartialEq)]
        struct Roster {
            people: Vec<Person>,
        }
    }

    let rules = RuleSet::new([
        Rule::bind_type::<Roster>("").unwrap(),
        Rule::bind_type_into::<Person>("[]", "people").unwrap(),
        Rule::bind_field::<Person>("[].firstName", "first_name").unwrap(),
    ])
    .unwrap();

    let roster: Roster = from_str(r#"[{"firstName":"A"},{"firstName":"B"}]"#, &rules).unwrap();
    let names: Vec<_> = roster.people.iter().map(|p| p.first_name.as_str()).collect();
    assert_eq!(names, ["A", "B"]);
}

#[test]
fn mappings_without_rules_are_passed_through() {
    let rules = RuleSet::new([
        Rule::bind_type::<Example>("").unwrap(),
        Rule::bind_field::<Example>("meta.source.client", "client").unwrap(),
    ])
    .unwrap();

    let example: Example =
        from_str(r#"{"meta":{"source":{"client":"Acme"},"other":1}}"#, &rules).unwrap();
    assert_eq!(example.client, "Acme");
}

#[test]
fn keys_that_look_like_paths_are_skipped() {
    let example: Example = from_str(
        r#"{"client.name":"nope","people[]":[1],"client":"Acme"}"#,
        &example_set(),
    )
    .unwrap();
    assert_eq!(example.client, "Acme");
    assert!(example.people.is_empty());
}

#[test]
fn null_leaves_defaults() {
    let json = r#"{"client":null,"people":[{"firstName":"Jo","age":null,"address":null}]}"#;
    let example: Example = from_str(json, &example_set()).unwrap();
    assert_eq!(example.client, "");
    assert_eq!(example.people[0].age, None);
    assert_eq!(example.people[0].address, None);
}

#[test]
fn null_element_in_object_sequence_is_a_mismatch() {
    let err = from_str::<Example>(r#"{"people":[{"firstName":"Jo"},null]}"#, &example_set())
        .unwrap_err();
    assert_eq!(
        err.kind,
        BindErrorKind::TypeMismatch {
            path: "people[1]".into(),
            expected: "Person".into(),
            got: "null",
        }
    );
}

#[test]
fn array_where_object_is_bound_is_a_mismatch() {
    let err = from_str::<Example>(r#"{"people":[{"address":[]}]}"#, &example_set()).unwrap_err();
    assert_eq!(
        err.kind,
        BindErrorKind::TypeMismatch {
            path: "people[0].address".into(),
            expected: "Address".into(),
            got: "array",
        }
    );
}

#[test]
fn integer_field_rejects_string() {
    let err = from_str::<Example>(r#"{"people":[{"age":"thirty"}]}"#, &example_set()).unwrap_err();
    assert_eq!(
        err.kind,
        BindErrorKind::TypeMismatch {
            path: "people[0].age".into(),
            expected: "u32".into(),
            got: "string",
        }
    );
}

#[test]
fn scalar_root_is_a_mismatch() {
    let err = from_str::<Example>("42", &example_set()).unwrap_err();
    assert_eq!(
        err.kind,
        BindErrorKind::TypeMismatch {
            path: String::new(),
            expected: "Example".into(),
            got: "number",
        }
    );
}

#[test]
fn malformed_input_reports_position() {
    let err = from_str::<Example>("{\n  \"client\": }", &example_set()).unwrap_err();
    match &err.kind {
        BindErrorKind::MalformedInput { message, position } => {
            assert_eq!(message, "unexpected '}', expected a value");
            assert_eq!((position.line, position.column), (2, 13));
        }
        other => panic!("expected malformed input, got {other:?}"),
    }
    assert!(err.source_code.is_some());
    assert!(err.span.is_some());
}

#[test]
fn trailing_content_is_malformed() {
    let err = from_str::<Example>(r#"{"client":"a"} {}"#, &example_set()).unwrap_err();
    assert!(matches!(err.kind, BindErrorKind::MalformedInput { .. }));
}

#[test]
fn missing_root_rule_wins_over_malformed_input() {
    let rules = RuleSet::new([Rule::bind_field::<Example>("client", "client").unwrap()]).unwrap();
    let err = from_str::<Example>("this is not json", &rules).unwrap_err();
    assert_eq!(err.kind, BindErrorKind::MissingRootRule);

    let err = deserialize(b"{", &rules).unwrap_err();
    assert_eq!(err.kind, BindErrorKind::MissingRootRule);
}

#[test]
fn typed_entry_point_checks_root_type() {
    let err = from_str::<Address>(PEOPLE_JSON, &example_set()).unwrap_err();
    assert_eq!(
        err.kind,
        BindErrorKind::RootTypeMismatch {
            requested: "Address",
            bound: "Example",
        }
    );
}

#[test]
fn nesting_limit_is_enforced() {
    let rules = example_set();
    let deserializer = Deserializer::new(&rules).with_options(&Options::new().with_max_depth(2));

    assert!(deserializer.deserialize_str(r#"{"a":{"b":1}}"#).is_ok());
    let err = deserializer
        .deserialize_str(r#"{"a":{"b":{"c":1}}}"#)
        .unwrap_err();
    assert_eq!(err.kind, BindErrorKind::DepthLimitExceeded { limit: 2 });
}

#[test]
fn default_nesting_limit_rejects_runaway_documents() {
    let json = format!("{}{}", "[".repeat(1000), "]".repeat(1000));
    let err = from_str::<Example>(&json, &example_set()).unwrap_err();
    assert_eq!(
        err.kind,
        BindErrorKind::DepthLimitExceeded {
            limit: json_bind::DEFAULT_MAX_DEPTH,
        }
    );
}

#[test]
fn errors_leave_no_partial_result() {
    let rules = example_set();
    let deserializer = Deserializer::new(&rules);
    let result = deserializer.deserialize_as::<Example>(
        br#"{"client":"Acme","people":[{"firstName":"Jo"},{"age":-1}]}"#,
    );
    assert!(matches!(
        result,
        Err(ref e) if matches!(e.kind, BindErrorKind::NumberOutOfRange { .. })
    ));
}
