//! The multiplicative group of integers modulo a prime, used as the foundation of the base OT.
//!
//! Primes are at most 64 bits wide, so every product fits into a `u128` before it is reduced.

use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The default bit size of generated primes.
pub const DEFAULT_PRIME_BITS: u32 = 64;

const MIN_PRIME_BITS: u32 = 8;
const MAX_PRIME_BITS: u32 = u64::BITS;
const MAX_PRIME_ATTEMPTS: usize = 1_000;
const MAX_GENERATOR_ATTEMPTS: usize = 1_000;

/// Witnesses for which Miller-Rabin is exact for all 64-bit integers.
const MILLER_RABIN_BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// The public description of a group, exchanged between the parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParameters {
    /// The prime modulus.
    pub prime: u64,
    /// A generator of the multiplicative group modulo `prime`.
    pub generator: u64,
}

/// An element of a [`PrimeGroup`], always in `[1, prime - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupElement(pub(crate) u64);

impl GroupElement {
    /// The integer representation of the element.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Cyclic group `Z_p^*` of order `p - 1` together with a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeGroup {
    prime: u64,
    generator: GroupElement,
    /// Distinct prime factors of `prime - 1`.
    factors: Vec<u64>,
}

impl PrimeGroup {
    /// Creates the group for an externally supplied prime and searches a random generator.
    pub fn new<R: RngCore + CryptoRng>(prime: u64, rng: &mut R) -> Result<Self, Error> {
        if prime < 5 || !is_prime(prime) {
            return Err(Error::InvalidGroupParameters(format!(
                "{prime} is not an odd prime > 3"
            )));
        }
        let mut group = Self {
            prime,
            generator: GroupElement(1),
            factors: prime_factors(prime - 1),
        };
        group.generator = group.find_generator(rng)?;
        Ok(group)
    }

    /// Generates a random prime of the given bit size and creates its group.
    pub fn generate<R: RngCore + CryptoRng>(bits: u32, rng: &mut R) -> Result<Self, Error> {
        let prime = generate_prime(bits, rng)?;
        Self::new(prime, rng)
    }

    /// Re-creates a group from parameters chosen by the other party, verifying them.
    pub fn from_parameters(params: GroupParameters) -> Result<Self, Error> {
        let GroupParameters { prime, generator } = params;
        if prime < 5 || !is_prime(prime) {
            return Err(Error::InvalidGroupParameters(format!(
                "{prime} is not an odd prime > 3"
            )));
        }
        if generator == 0 || generator >= prime {
            return Err(Error::InvalidGroupParameters(format!(
                "generator {generator} is not a group element"
            )));
        }
        let group = Self {
            prime,
            generator: GroupElement(generator),
            factors: prime_factors(prime - 1),
        };
        if !group.is_generator(generator) {
            return Err(Error::InvalidGroupParameters(format!(
                "{generator} does not generate the group"
            )));
        }
        Ok(group)
    }

    /// The public parameters of this group.
    pub fn parameters(&self) -> GroupParameters {
        GroupParameters {
            prime: self.prime,
            generator: self.generator.0,
        }
    }

    /// The prime modulus.
    pub fn prime(&self) -> u64 {
        self.prime
    }

    /// The generator of the group.
    pub fn generator(&self) -> GroupElement {
        self.generator
    }

    /// Checks that a value received from the other party is an element of the group.
    pub fn element(&self, value: u64) -> Result<GroupElement, Error> {
        if value == 0 || value >= self.prime {
            Err(Error::InvalidGroupElement(value))
        } else {
            Ok(GroupElement(value))
        }
    }

    /// `a * b mod p`
    pub fn multiply(&self, a: GroupElement, b: GroupElement) -> GroupElement {
        GroupElement(mul_mod(a.0, b.0, self.prime))
    }

    /// `base ^ exponent mod p`
    pub fn power(&self, base: GroupElement, exponent: u64) -> GroupElement {
        GroupElement(pow_mod(base.0, exponent, self.prime))
    }

    /// `generator ^ exponent mod p`
    pub fn generator_power(&self, exponent: u64) -> GroupElement {
        self.power(self.generator, exponent)
    }

    /// The multiplicative inverse `a ^ (p - 2) mod p`.
    pub fn invert(&self, a: GroupElement) -> Result<GroupElement, Error> {
        if a.0 % self.prime == 0 {
            return Err(Error::NotInvertible);
        }
        Ok(self.power(a, self.prime - 2))
    }

    /// A uniformly random exponent in `[1, p - 1]`.
    pub fn random_exponent<R: RngCore + CryptoRng>(&self, rng: &mut R) -> u64 {
        rng.gen_range(1..self.prime)
    }

    /// Samples random candidates until one of them generates the whole group.
    fn find_generator<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<GroupElement, Error> {
        for _ in 0..MAX_GENERATOR_ATTEMPTS {
            let candidate = self.random_exponent(rng);
            if self.is_generator(candidate) {
                return Ok(GroupElement(candidate));
            }
        }
        Err(Error::GeneratorNotFound)
    }

    fn is_generator(&self, candidate: u64) -> bool {
        let order = self.prime - 1;
        self.factors
            .iter()
            .all(|f| pow_mod(candidate, order / f, self.prime) != 1)
    }
}

fn generate_prime<R: Rng>(bits: u32, rng: &mut R) -> Result<u64, Error> {
    if !(MIN_PRIME_BITS..=MAX_PRIME_BITS).contains(&bits) {
        return Err(Error::InvalidGroupParameters(format!(
            "primes must have between {MIN_PRIME_BITS} and {MAX_PRIME_BITS} bits, not {bits}"
        )));
    }
    let top = 1u64 << (bits - 1);
    let max = if bits == MAX_PRIME_BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    for _ in 0..MAX_PRIME_ATTEMPTS {
        // scan upwards from a random odd start, resampling if the scan leaves the bit width
        let mut candidate = (rng.gen::<u64>() & max) | top | 1;
        loop {
            if is_prime(candidate) {
                return Ok(candidate);
            }
            match candidate.checked_add(2) {
                Some(next) if next <= max => candidate = next,
                _ => break,
            }
        }
    }
    Err(Error::PrimeNotFound(bits))
}

#[inline]
fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(base: u64, mut exponent: u64, m: u64) -> u64 {
    let mut result = 1 % m;
    let mut base = base % m;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exponent >>= 1;
    }
    result
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Deterministic Miller-Rabin primality test for 64-bit integers.
pub(crate) fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for p in MILLER_RABIN_BASES {
        if n % p == 0 {
            return n == p;
        }
    }
    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;
    'witness: for a in MILLER_RABIN_BASES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Finds a non-trivial divisor of an odd composite `n` (Pollard's rho, Floyd cycle detection).
fn pollard_rho(n: u64) -> u64 {
    let mut c = 1u64;
    loop {
        let f = |x: u64| ((x as u128 * x as u128 + c as u128) % n as u128) as u64;
        let (mut x, mut y, mut d) = (2u64, 2u64, 1u64);
        while d == 1 {
            x = f(x);
            y = f(f(y));
            d = gcd(x.abs_diff(y), n);
        }
        if d != n {
            return d;
        }
        c += 1;
    }
}

/// The distinct prime factors of `n`, in ascending order.
pub(crate) fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = vec![];
    for p in MILLER_RABIN_BASES {
        if n % p == 0 {
            factors.push(p);
            while n % p == 0 {
                n /= p;
            }
        }
    }
    let mut composites = vec![n];
    while let Some(m) = composites.pop() {
        if m == 1 {
            continue;
        }
        if is_prime(m) {
            factors.push(m);
        } else {
            let d = pollard_rho(m);
            composites.push(d);
            composites.push(m / d);
        }
    }
    factors.sort_unstable();
    factors.dedup();
    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_is_prime() {
        let primes = [2, 3, 5, 37, 41, 7919, 1_000_000_007, 18_446_744_073_709_551_557];
        let composites = [0, 1, 4, 39, 561, 1_000_000_007 * 3, 3_215_031_751, u64::MAX];
        for p in primes {
            assert!(is_prime(p), "{p} is prime");
        }
        for c in composites {
            assert!(!is_prime(c), "{c} is composite");
        }
    }

    #[test]
    fn test_prime_factors() {
        assert_eq!(prime_factors(22), vec![2, 11]);
        assert_eq!(prime_factors(2 * 2 * 3 * 41 * 41), vec![2, 3, 41]);
        assert_eq!(
            prime_factors(1_000_000_007 * 998_244_353),
            vec![998_244_353, 1_000_000_007]
        );
        for f in prime_factors(18_446_744_073_709_551_556) {
            assert!(is_prime(f));
            assert_eq!(18_446_744_073_709_551_556 % f, 0);
        }
    }

    #[test]
    fn test_generated_group() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for bits in [8, 16, 32, 64] {
            let group = PrimeGroup::generate(bits, &mut rng).unwrap();
            let p = group.prime();
            assert!(is_prime(p));
            assert_eq!(u64::BITS - p.leading_zeros(), bits);
            assert_eq!(group.generator_power(p - 1), GroupElement(1));
            for f in prime_factors(p - 1) {
                assert_ne!(group.generator_power((p - 1) / f), GroupElement(1));
            }
        }
    }

    #[test]
    fn test_arithmetic() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let group = PrimeGroup::new(23, &mut rng).unwrap();
        let a = group.element(5).unwrap();
        let b = group.element(7).unwrap();
        assert_eq!(group.multiply(a, b), GroupElement(35 % 23));
        assert_eq!(group.power(a, 3), GroupElement(125 % 23));
        let inv = group.invert(a).unwrap();
        assert_eq!(group.multiply(a, inv), GroupElement(1));
        for _ in 0..100 {
            let e = group.random_exponent(&mut rng);
            assert!((1..23).contains(&e));
        }
    }

    #[test]
    fn test_element_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let group = PrimeGroup::new(23, &mut rng).unwrap();
        assert_eq!(group.element(0), Err(Error::InvalidGroupElement(0)));
        assert_eq!(group.element(23), Err(Error::InvalidGroupElement(23)));
        assert_eq!(group.element(22), Ok(GroupElement(22)));
    }

    #[test]
    fn test_from_parameters() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let group = PrimeGroup::generate(32, &mut rng).unwrap();
        assert_eq!(PrimeGroup::from_parameters(group.parameters()), Ok(group.clone()));

        // 1 never generates a group of order > 1
        let params = GroupParameters {
            prime: group.prime(),
            generator: 1,
        };
        assert!(matches!(
            PrimeGroup::from_parameters(params),
            Err(Error::InvalidGroupParameters(_))
        ));

        let params = GroupParameters {
            prime: 25,
            generator: 2,
        };
        assert!(matches!(
            PrimeGroup::from_parameters(params),
            Err(Error::InvalidGroupParameters(_))
        ));
    }

    #[test]
    fn test_invalid_prime_bits() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        assert!(PrimeGroup::generate(4, &mut rng).is_err());
        assert!(PrimeGroup::generate(65, &mut rng).is_err());
    }
}
