//! Random names and credentials for parameters the user left out
//!
//! The provisioner only sees the [`NameGenerator`] and [`CredentialGenerator`] traits.
//! [`RandomGenerator`] implements both over any `rand` RNG so tests can seed it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Mutex;

/// Total length of generated resource names
pub const GENERATED_NAME_LENGTH: usize = 15;

/// Length of generated administrator passwords
pub const GENERATED_PASSWORD_LENGTH: usize = 16;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!#%*-_+=?";

/// Produces names for resources the user did not name
pub trait NameGenerator: Send + Sync {
    fn resource_group_name(&self) -> String;
    fn server_name(&self) -> String;
    fn admin_user(&self) -> String;
}

/// Produces administrator passwords
pub trait CredentialGenerator: Send + Sync {
    fn password(&self) -> String;
}

/// `rand`-backed generator for names and passwords
pub struct RandomGenerator<R = StdRng> {
    rng: Mutex<R>,
}

impl RandomGenerator<StdRng> {
    /// Generator seeded from the operating system
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }
}

impl Default for RandomGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + Send> RandomGenerator<R> {
    pub fn from_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    /// `prefix` followed by random digits up to [`GENERATED_NAME_LENGTH`] characters
    pub fn random_name(&self, prefix: &str) -> String {
        let digits = GENERATED_NAME_LENGTH.saturating_sub(prefix.len());
        self.with_rng(|rng| {
            let mut name = String::with_capacity(GENERATED_NAME_LENGTH);
            name.push_str(prefix);
            for _ in 0..digits {
                name.push(char::from(DIGITS[rng.gen_range(0..DIGITS.len())]));
            }
            name
        })
    }
}

impl<R: RngCore + Send> NameGenerator for RandomGenerator<R> {
    fn resource_group_name(&self) -> String {
        self.random_name("group")
    }

    fn server_name(&self) -> String {
        self.random_name("server")
    }

    fn admin_user(&self) -> String {
        // Starts with a letter, lowercase only
        self.with_rng(|rng| {
            let mut user = String::from("admin");
            for _ in 0..6 {
                user.push(char::from(LOWER[rng.gen_range(0..LOWER.len())]));
            }
            user
        })
    }
}

impl<R: RngCore + Send> CredentialGenerator for RandomGenerator<R> {
    fn password(&self) -> String {
        self.with_rng(|rng| {
            let classes = [LOWER, UPPER, DIGITS, SYMBOLS];
            let mut chars: Vec<u8> = classes
                .iter()
                .map(|class| class[rng.gen_range(0..class.len())])
                .collect();

            let all: Vec<u8> = classes.concat();
            while chars.len() < GENERATED_PASSWORD_LENGTH {
                chars.push(all[rng.gen_range(0..all.len())]);
            }
            chars.shuffle(rng);
            chars.into_iter().map(char::from).collect()
        })
    }
}
