use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use yao::{GroupParameters, PrimeGroup};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn generated_group_is_cyclic(seed in any::<u64>(), bits in 8u32..=64) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let group = PrimeGroup::generate(bits, &mut rng).unwrap();
        let p = group.prime();
        prop_assert_eq!(64 - p.leading_zeros(), bits);
        prop_assert_eq!(group.generator_power(p - 1).value(), 1);
        prop_assert_eq!(PrimeGroup::from_parameters(group.parameters()).unwrap(), group);
    }

    #[test]
    fn inverse_and_exponent_laws(seed in any::<u64>(), a in 1u64..u64::MAX, b in 1u64..u64::MAX) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let group = PrimeGroup::generate(48, &mut rng).unwrap();
        let x = group.generator_power(a);
        let y = group.generator_power(b);
        let one = group.generator_power(0);

        prop_assert_eq!(group.multiply(x, group.invert(x).unwrap()), one);
        prop_assert_eq!(group.multiply(x, y), group.multiply(y, x));
        // g^a^b = g^b^a, the basis of the Diffie-Hellman key agreement
        prop_assert_eq!(group.power(x, b), group.power(y, a));

        let e = group.random_exponent(&mut rng);
        prop_assert!((1..group.prime()).contains(&e));
    }

    #[test]
    fn rejects_non_generators(seed in any::<u64>()) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let group = PrimeGroup::generate(32, &mut rng).unwrap();
        let square = group.power(group.generator(), 2);
        let params = GroupParameters {
            prime: group.prime(),
            generator: square.value(),
        };
        prop_assert!(PrimeGroup::from_parameters(params).is_err());
    }
}
