use std::collections::HashMap;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use yao::{evaluate, parse_inputs, Circuit, GarbledCircuit, GarblerOptions, PrimeGroup};

const MAX_4BIT: &str = include_str!("../circuits/max_4bit.json");

fn garble_and_evaluate(circuit: &Circuit, rng: &mut ChaCha20Rng) -> Result<Vec<bool>, yao::Error> {
    let garbled = GarbledCircuit::garble(circuit, rng)?;
    let mut inputs: HashMap<_, _> = garbled
        .encode_inputs(circuit.alice_wires(), &[true, false, true, false])?
        .into_iter()
        .collect();
    for &wire in circuit.bob_wires() {
        inputs.insert(wire, garbled.offered_labels(wire)?[1]);
    }
    evaluate(circuit, garbled.tables(), garbled.pbits_out(), inputs)
}

fn bench_garbling(c: &mut Criterion) {
    let circuit = Circuit::from_json(MAX_4BIT).unwrap().remove(0);
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    c.bench_function("garble + evaluate 4-bit max", |b| {
        b.iter(|| garble_and_evaluate(&circuit, &mut rng).unwrap())
    });
}

fn bench_group_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("prime group generation");
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    for bits in [16, 32, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(bits), &bits, |b, &bits| {
            b.iter(|| PrimeGroup::generate(bits, &mut rng).unwrap())
        });
    }
    group.finish();
}

fn bench_protocol(c: &mut Criterion) {
    let circuits = Circuit::from_json(MAX_4BIT).unwrap();
    let alice = parse_inputs("3 9 12 1", 4).unwrap();
    let bob = parse_inputs("5 7", 4).unwrap();
    let mut group = c.benchmark_group("simulated protocol");
    group.sample_size(10);
    for prime_bits in [32, 64] {
        let options = GarblerOptions {
            prime_bits,
            oblivious_transfer: true,
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(prime_bits),
            &options,
            |b, &options| b.iter(|| yao::simulate(&circuits, &alice, &bob, options).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_garbling,
    bench_group_generation,
    bench_protocol
);
criterion_main!(benches);
