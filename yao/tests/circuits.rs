use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use yao::{decode_output, evaluate, Circuit, Error, GarbledCircuit, Gate, GateOp, InputRow};

const MAX_4BIT: &str = include_str!("../circuits/max_4bit.json");

fn max_circuit() -> Circuit {
    let mut circuits = Circuit::from_json(MAX_4BIT).unwrap();
    assert_eq!(circuits.len(), 1);
    circuits.remove(0)
}

#[test]
fn test_max_circuit_plaintext() -> Result<(), Error> {
    let circuit = max_circuit();
    for a in 0..16 {
        for b in 0..16 {
            let alice = InputRow::new(a, 4)?;
            let bob = InputRow::new(b, 4)?;
            let output = circuit.evaluate_plaintext(alice.bits(), bob.bits())?;
            assert_eq!(decode_output(&output)?, a.max(b) as u64, "max({a}, {b})");
        }
    }
    Ok(())
}

#[test]
fn test_max_circuit_garbled() -> Result<(), Error> {
    let circuit = max_circuit();
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    for a in 0..16 {
        for b in 0..16 {
            let alice = InputRow::new(a, 4)?;
            let bob = InputRow::new(b, 4)?;
            let garbled = GarbledCircuit::garble(&circuit, &mut rng)?;

            let mut inputs: HashMap<_, _> = garbled
                .encode_inputs(circuit.alice_wires(), alice.bits())?
                .into_iter()
                .collect();
            for (&wire, &bit) in circuit.bob_wires().iter().zip(bob.bits()) {
                inputs.insert(wire, garbled.offered_labels(wire)?[bit as usize]);
            }

            let output = evaluate(&circuit, garbled.tables(), garbled.pbits_out(), inputs)?;
            assert_eq!(
                output,
                circuit.evaluate_plaintext(alice.bits(), bob.bits())?
            );
        }
    }
    Ok(())
}

#[test]
fn test_parse_circuit_file() {
    let json = r#"{
        "name": "and",
        "circuits": [
            { "id": "and", "alice": [1], "bob": [2], "out": [3],
              "gates": [ { "id": 3, "type": "AND", "in": [1, 2] } ] }
        ]
    }"#;
    let circuits = Circuit::from_json(json).unwrap();
    let expected = Circuit::new(
        "and",
        vec![Gate::binary(GateOp::And, 1, 2, 3)],
        vec![1],
        vec![2],
        vec![3],
    );
    assert_eq!(circuits, vec![expected]);

    let unknown_gate = json.replace("AND", "MUX");
    assert!(matches!(
        Circuit::from_json(&unknown_gate),
        Err(Error::CircuitFile(_))
    ));
}

#[test]
fn test_missing_output_wires() {
    let circuit = Circuit::new(
        "no outputs",
        vec![Gate::binary(GateOp::Xor, 1, 2, 3)],
        vec![1],
        vec![2],
        vec![],
    );
    assert!(matches!(circuit.validate(), Err(Error::InvalidCircuit(_))));

    let circuit = Circuit::new(
        "unknown output",
        vec![Gate::binary(GateOp::Xor, 1, 2, 3)],
        vec![1],
        vec![2],
        vec![4],
    );
    assert!(matches!(circuit.validate(), Err(Error::InvalidCircuit(_))));
}

#[test]
fn test_invalid_gates() {
    let undefined_input = Circuit::new(
        "undefined input",
        vec![Gate::binary(GateOp::And, 1, 500, 3)],
        vec![1],
        vec![2],
        vec![3],
    );
    let not_yet_defined = Circuit::new(
        "wrong order",
        vec![
            Gate::binary(GateOp::And, 1, 4, 3),
            Gate::binary(GateOp::Or, 1, 2, 4),
        ],
        vec![1],
        vec![2],
        vec![3],
    );
    let assigned_twice = Circuit::new(
        "assigned twice",
        vec![Gate::binary(GateOp::And, 1, 2, 2)],
        vec![1],
        vec![2],
        vec![2],
    );
    let shared_input = Circuit::new(
        "shared input",
        vec![Gate::binary(GateOp::And, 1, 2, 3)],
        vec![1, 2],
        vec![2],
        vec![3],
    );
    let wrong_arity = Circuit::new(
        "unary and",
        vec![Gate {
            output: 3,
            op: GateOp::And,
            inputs: vec![1],
        }],
        vec![1],
        vec![2],
        vec![3],
    );
    for circuit in [
        undefined_input,
        not_yet_defined,
        assigned_twice,
        shared_input,
        wrong_arity,
    ] {
        assert!(
            matches!(circuit.validate(), Err(Error::InvalidCircuit(_))),
            "{}",
            circuit.id()
        );
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!(GarbledCircuit::garble(&circuit, &mut rng).is_err());
    }
}

#[test]
fn test_load_missing_file() {
    assert!(matches!(
        yao::load_circuits("does/not/exist.json"),
        Err(Error::Io(_))
    ));
}
