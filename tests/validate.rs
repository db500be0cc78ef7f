use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use vx::{validate, Phase, Reflect, Validator, Value};

vx::record! {
    struct Untagged {
        name: String,
        age: i64,
        scores: Vec<f64>,
        extra: Value,
    }
}

vx::record! {
    struct EmptyTags {
        #[vx = ""]
        name: String,
        #[vx = " , "]
        age: i64,
    }
}

vx::record! {
    struct Handle {
        #[vx = "name=handle, minLength=5"]
        text: String,
    }
}

vx::record! {
    struct ZeroMin {
        #[vx = "minLength=0, required"]
        text: String,
    }
}

vx::record! {
    struct Anything {
        #[vx = "required"]
        value: Value,
    }
}

vx::record! {
    struct Optional {
        #[vx = "name=nick, required"]
        nick: Option<String>,
    }
}

vx::record! {
    struct Labels {
        #[vx = "name=labels, type=map[string]string"]
        labels: Value,
    }
}

vx::record! {
    struct Codes {
        #[vx = "type=[10]string"]
        codes: Value,
    }
}

vx::record! {
    #[derive(Clone)]
    struct Address {
        #[vx = "name=city, required, minLength=3"]
        city: String,
    }
}

vx::record! {
    struct Person {
        #[vx = "name=name, required"]
        name: String,
        #[vx = "name=address"]
        address: Address,
    }
}

vx::record! {
    struct Tagged {
        #[vx = "name=email, type=string, required, minLength=3"]
        email: Value,
        #[vx = "type=[]int"]
        ids: Value,
        #[vx = "type=map[string][]float64"]
        weights: Value,
    }
}

fn strings(n: usize) -> Value {
    Value::any_array((0..n).map(|i| Value::from(format!("c{i}"))).collect())
}

#[test]
fn records_without_tags_are_valid() {
    let report = validate(&Untagged {
        name: String::new(),
        age: 0,
        scores: vec![],
        extra: Value::Null,
    });
    assert!(report.well_formed());
    assert!(report.errors().is_empty());
}

#[test]
fn empty_tags_behave_like_no_tags() {
    let report = validate(&EmptyTags { name: String::new(), age: -1 });
    assert!(report.is_valid());
}

#[test]
fn min_length_boundary() {
    let report = validate(&Handle { text: "yolo".into() });
    assert!(report.well_formed());
    assert_eq!(report.messages(), ["handle: minLength: should have a minimum length of 5 but has 4"]);
    assert_eq!(report.errors()[0].phase(), Phase::Rule);

    assert!(validate(&Handle { text: "happy".into() }).is_valid());
}

#[test]
fn zero_min_length_is_a_schema_error_and_no_rule_runs() {
    // "" would violate `required` if rules were evaluated
    let report = validate(&ZeroMin { text: String::new() });
    assert!(!report.well_formed());
    assert_eq!(report.messages(), ["text: minLength should be greater than 0, got 0"]);
    assert_eq!(report.errors()[0].phase(), Phase::Schema);
}

#[test]
fn required_on_a_wildcard_field() {
    let report = validate(&Anything { value: "".into() });
    assert_eq!(report.messages(), ["value: is required"]);

    assert!(validate(&Anything { value: Value::Int(0) }).is_valid());
    assert!(validate(&Anything { value: Value::Bool(false) }).is_valid());
    assert!(validate(&Anything { value: Value::any_sequence(vec![]) }).is_valid());

    let report = validate(&Anything { value: Value::Null });
    assert_eq!(report.messages(), ["value: is required"]);
}

#[test]
fn required_on_an_unset_option() {
    assert_eq!(validate(&Optional { nick: None }).messages(), ["nick: is required"]);
    assert!(validate(&Optional { nick: Some("z".into()) }).is_valid());
}

#[test]
fn wildcard_maps_conform_by_their_entries() {
    assert!(validate(&Labels { labels: Value::any_map(vec![]) }).is_valid());

    let ok = Value::any_map(vec![("env".into(), "prod".into())]);
    assert!(validate(&Labels { labels: ok }).is_valid());

    let bad_key = Value::any_map(vec![("env".into(), "prod".into()), (Value::Int(1), "x".into())]);
    let report = validate(&Labels { labels: bad_key });
    assert!(report.well_formed());
    assert_eq!(report.messages(), ["labels: map key should be of type string but got int"]);
    assert_eq!(report.errors()[0].phase(), Phase::TypeMatch);
}

#[test]
fn fixed_arrays_check_their_length() {
    assert!(validate(&Codes { codes: strings(10) }).is_valid());

    let report = validate(&Codes { codes: strings(9) });
    assert!(report.well_formed());
    assert_eq!(report.messages(), ["codes: expected an array of length 10 but got 9"]);
}

#[test]
fn nested_errors_are_qualified_by_the_outer_field() {
    let person = Person {
        name: "Ada".into(),
        address: Address { city: "Oz".into() },
    };
    let report = validate(&person);
    assert!(report.well_formed());
    assert_eq!(report.messages(), ["address.city: minLength: should have a minimum length of 3 but has 2"]);

    let fine = Person { name: "Ada".into(), address: Address { city: "Oslo".into() } };
    assert!(validate(&fine).is_valid());
}

#[test]
fn polymorphic_containers_report_the_first_bad_element() {
    let report = validate(&Tagged {
        email: "a@b.c".into(),
        ids: Value::any_sequence(vec![Value::Int(1), "two".into(), Value::Float(3.0)]),
        weights: Value::any_map(vec![]),
    });
    assert!(report.well_formed());
    assert_eq!(report.messages(), ["ids[1]: should be of type int but got string"]);
}

#[test]
fn type_errors_suppress_every_rule() {
    let report = validate(&Tagged {
        email: Value::Int(7),
        ids: Value::Null,
        weights: Value::any_map(vec![("w".into(), Value::any_sequence(vec![Value::Float(1.0)]))]),
    });
    assert_eq!(report.messages(), ["email: should be of type string but got int"]);
}

#[test]
fn std_maps_are_typed_containers() {
    vx::record! {
        struct Inventory {
            #[vx = "type=map[string]int"]
            stock: BTreeMap<String, i64>,
        }
    }
    let stock = BTreeMap::from([("apples".to_string(), 3)]);
    assert!(validate(&Inventory { stock }).is_valid());
}

#[test]
fn validation_is_idempotent() {
    let person = Person {
        name: String::new(),
        address: Address { city: "Oz".into() },
    };
    let validator = Validator::new();
    assert_eq!(validator.validate(&person), validator.validate(&person));
    assert_eq!(validator.validate(&person).messages(), [
        "name: is required",
        "address.city: minLength: should have a minimum length of 3 but has 2",
    ]);
}

#[test]
fn reports_serialize_as_messages() {
    let report = validate(&Handle { text: "yolo".into() });
    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        serde_json::json!({
            "well_formed": true,
            "errors": ["handle: minLength: should have a minimum length of 5 but has 4"],
        })
    );
}

#[test]
fn one_validator_serves_many_threads() {
    let validator = Validator::new();
    std::thread::scope(|s| {
        for i in 0..4 {
            let validator = &validator;
            s.spawn(move || {
                let text = "x".repeat(i + 3);
                let report = validator.validate(&Handle { text });
                assert_eq!(report.is_valid(), i + 3 >= 5);
            });
        }
    });
}

#[test]
fn wildcard_tags_accept_nested_typed_containers() {
    vx::record! {
        struct Loose {
            #[vx = "name=f, type=[][]any"]
            grid: Value,
            #[vx = "type=map[string]map[string]any"]
            index: Value,
        }
    }
    let grid = vec![vec!["a".to_string()]].reflect();
    let index = BTreeMap::from([("k".to_string(), BTreeMap::from([("n".to_string(), 1i64)]))]).reflect();
    assert!(validate(&Loose { grid, index }).is_valid());

    let flat = vec![1i64].reflect();
    let report = validate(&Loose { grid: flat, index: Value::Null });
    assert_eq!(report.messages(), ["f: should be of type [][]any but got []int"]);
}
