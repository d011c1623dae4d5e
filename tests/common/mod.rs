#![allow(dead_code)]

use json_bind::{Rule, RuleSet, bindable};

bindable! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Example {
        pub client: String,
        pub people: Vec<Person>,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Person {
        pub person_id: Option<u64>,
        pub first_name: String,
        pub last_name: String,
        pub age: Option<u32>,
        pub address: Option<Box<Address>>,
        pub phone_numbers: Vec<PhoneNumber>,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Address {
        pub street_address: String,
        pub city: String,
        pub state: String,
        pub postal_code: Option<u32>,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct PhoneNumber {
        pub kind: String,
        pub number: String,
    }
}

/// Rules for the people document used throughout the tests.
pub fn example_rules() -> Vec<Rule> {
    vec![
        Rule::bind_type::<Example>("").unwrap(),
        Rule::bind_field::<Example>("client", "client").unwrap(),
        Rule::bind_type_into::<Person>("people[]", "people").unwrap(),
        Rule::bind_field::<Person>("people[].id", "person_id").unwrap(),
        Rule::bind_field::<Person>("people[].firstName", "first_name").unwrap(),
        Rule::bind_field::<Person>("people[].lastName", "last_name").unwrap(),
        Rule::bind_field::<Person>("people[].age", "age").unwrap(),
        Rule::bind_type_into::<Address>("people[].address", "address").unwrap(),
        Rule::bind_field::<Address>("people[].address.streetAddress", "street_address").unwrap(),
        Rule::bind_field::<Address>("people[].address.city", "city").unwrap(),
        Rule::bind_field::<Address>("people[].address.state", "state").unwrap(),
        Rule::bind_field::<Address>("people[].address.postalCode", "postal_code").unwrap(),
        Rule::bind_field::<Person>("people[].phoneNumbers", "phone_numbers").unwrap(),
        Rule::bind_type::<PhoneNumber>("people[].phoneNumbers[]").unwrap(),
        Rule::bind_field::<PhoneNumber>("people[].phoneNumbers[].type", "kind").unwrap(),
        Rule::bind_field::<PhoneNumber>("people[].phoneNumbers[].number", "number").unwrap(),
    ]
}

pub fn example_set() -> RuleSet {
    RuleSet::new(example_rules()).unwrap()
}

pub const PEOPLE_JSON: &str = r#"{
  "client": "Acme Widgets",
  "people": [
    {
      "id": 1,
      "firstName": "John",
      "lastName": "Smith",
      "age": 25,
      "address": {
        "streetAddress": "21 2nd Street",
        "city": "New York",
        "state": "NY",
        "postalCode": 10021
      },
      "phoneNumbers": [
        { "type": "home", "number": "212 555-1234" },
        { "type": "fax", "number": "646 555-4567" }
      ]
    },
    {
      "id": 2,
      "firstName": "Jane",
      "lastName": "Doe",
      "age": null,
      "phoneNumbers": []
    }
  ]
}"#;

pub fn people() -> Example {
    Example {
        client: "Acme Widgets".into(),
        people: vec![
            Person {
                person_id: Some(1),
                first_name: "John".into(),
                last_name: "Smith".into(),
                age: Some(25),
                address: Some(Box::new(Address {
                    street_address: "21 2nd Street".into(),
                    city: "New York".into(),
                    state: "NY".into(),
                    postal_code: Some(10021),
                })),
                phone_numbers: vec![
                    PhoneNumber {
                        kind: "home".into(),
                        number: "212 555-1234".into(),
                    },
                    PhoneNumber {
                        kind: "fax".into(),
                        number: "646 555-4567".into(),
                    },
                ],
            },
            Person {
                person_id: Some(2),
                first_name: "Jane".into(),
                last_name: "Doe".into(),
                ..Person::default()
            },
        ],
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
