//! Re-engineering analyses (RPA, EPA) and the higher-level protocols
//! (keypair generation, ECDH, a low-level ECDSA primitive) built on
//! `ec-core`'s execution engine and `ec-mult`'s scalar multipliers
//! (spec.md §4.7, §5).
//!
//! Grounded on `examples/original_source/pyecsca/sca/re/rpa.py` and
//! `epa.py` for the two analyses, and on
//! `elliptic-curve-crate/src/weierstrass/secret_key.rs` +
//! `elliptic-curve-crate/src/weierstrass/ecdsa.rs` for the protocol layer
//! — a sibling crate to `ec-graph`, consuming `ec-core`/`ec-mult`'s public
//! API rather than folding analysis code into either.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

extern crate alloc;

pub mod der;
pub mod ecdh;
pub mod ecdsa;
pub mod epa;
pub mod error;
pub mod keygen;
pub mod rpa;

pub use der::{decode_signature, encode_signature};
pub use ecdh::shared_secret;
pub use ecdsa::{RecoverPrimitive, Signature, SignPrimitive, VerifyPrimitive};
pub use epa::{errors_out, evaluate_checks, graph_to_check_inputs, CheckCondition};
pub use error::{Error, Result};
pub use keygen::{generate_keypair, PublicKey, SecretKey};
pub use rpa::{rpa_distinguish, rpa_point_0y, rpa_point_x0};
