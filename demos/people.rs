//! Bind a small address book, print it, write it back out, and show what a
//! broken document looks like.

use json_bind::{Rule, RuleSet, bindable};
use miette::{GraphicalReportHandler, GraphicalTheme};
use owo_colors::OwoColorize;

bindable! {
    #[derive(Debug, Default)]
    pub struct Example {
        pub client: String,
        pub people: Vec<Person>,
    }

    #[derive(Debug, Default)]
    pub struct Person {
        pub person_id: Option<u64>,
        pub first_name: String,
        pub last_name: String,
        pub age: Option<u32>,
        pub address: Option<Box<Address>>,
        pub phone_numbers: Vec<PhoneNumber>,
    }

    #[derive(Debug, Default)]
    pub struct Address {
        pub street_address: String,
        pub city: String,
        pub state: String,
        pub postal_code: Option<u32>,
    }

    #[derive(Debug, Default)]
    pub struct PhoneNumber {
        pub kind: String,
        pub number: String,
    }
}

const DOCUMENT: &str = r#"{
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
    }
  ]
}"#;

const BROKEN: &str = r#"{
  "client": "Acme Widgets",
  "people": [
    { "firstName": "John", "age": 25, }
  ]
}"#;

fn rules() -> json_bind::Result<RuleSet> {
    RuleSet::new([
        Rule::bind_type::<Example>("")?,
        Rule::bind_field::<Example>("client", "client")?,
        Rule::bind_type_into::<Person>("people[]", "people")?,
        Rule::bind_field::<Person>("people[].id", "person_id")?,
        Rule::bind_field::<Person>("people[].firstName", "first_name")?,
        Rule::bind_field::<Person>("people[].lastName", "last_name")?,
        Rule::bind_field::<Person>("people[].age", "age")?,
        Rule::bind_type_into::<Address>("people[].address", "address")?,
        Rule::bind_field::<Address>("people[].address.streetAddress", "street_address")?,
        Rule::bind_field::<Address>("people[].address.city", "city")?,
        Rule::bind_field::<Address>("people[].address.state", "state")?,
        Rule::bind_field::<Address>("people[].address.postalCode", "postal_code")?,
        Rule::bind_type_into::<PhoneNumber>("people[].phoneNumbers[]", "phone_numbers")?,
        Rule::bind_field::<PhoneNumber>("people[].phoneNumbers[].type", "kind")?,
        Rule::bind_field::<PhoneNumber>("people[].phoneNumbers[].number", "number")?,
    ])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let rules = rules()?;

    println!("{}", "Bound object graph".bold().green());
    let example: Example = json_bind::from_str(DOCUMENT, &rules)?;
    println!("{example:#?}");

    println!("\n{}", "Written back".bold().green());
    println!("{}", json_bind::to_string_pretty(&example, &rules)?);

    println!("\n{}", "A broken document".bold().yellow());
    if let Err(err) = json_bind::from_str::<Example>(BROKEN, &rules) {
        let mut report = String::new();
        GraphicalReportHandler::new_themed(GraphicalTheme::unicode()).render_report(&mut report, &err)?;
        println!("{report}");
    }

    Ok(())
}
