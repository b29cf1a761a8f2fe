//! ASN.1 DER codec for ECDSA signatures (spec.md §6):
//! `SEQUENCE { INTEGER r, INTEGER s }`.
//!
//! Grounded on
//! `examples/RustCrypto-elliptic-curves/sm2/src/dsa/der.rs`'s
//! `SignatureRef`/manual `Sequence` impl, which is how the teacher
//! workspace itself encodes this exact shape elsewhere (`sm2`, `bign256`,
//! `bignp256` all depend on the `der` crate for it). Generalized from the
//! teacher's fixed-size `Array<u8, MaxSize>` (sized from a const-generic
//! curve's field width) to a `Vec<u8>`, since `r`/`s` here are
//! arbitrary-precision `BigUint`s rather than fixed-width scalars — the
//! `der` crate's `Encode`/`Decode`/`UintRef` do the actual TLV work either
//! way.

use alloc::vec::Vec;

use der::asn1::UintRef;
use der::{Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, Writer};
use num_bigint::BigUint;

use crate::ecdsa::Signature;
use crate::error::{Error, Result};

struct SignatureRef<'a> {
    r: UintRef<'a>,
    s: UintRef<'a>,
}

impl EncodeValue for SignatureRef<'_> {
    fn value_len(&self) -> der::Result<Length> {
        self.r.encoded_len()? + self.s.encoded_len()?
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.r.encode(writer)?;
        self.s.encode(writer)?;
        Ok(())
    }
}

impl<'a> DecodeValue<'a> for SignatureRef<'a> {
    type Error = der::Error;

    fn decode_value<R: Reader<'a>>(reader: &mut R, _header: Header) -> der::Result<Self> {
        Ok(SignatureRef {
            r: UintRef::decode(reader)?,
            s: UintRef::decode(reader)?,
        })
    }
}

impl<'a> Sequence<'a> for SignatureRef<'a> {}

fn uint_bytes(value: &BigUint) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes.is_empty() {
        alloc::vec![0u8]
    } else {
        bytes
    }
}

/// Encode `signature` as a DER `SEQUENCE { INTEGER r, INTEGER s }`.
pub fn encode_signature(signature: &Signature) -> Result<Vec<u8>> {
    let r_bytes = uint_bytes(&signature.r);
    let s_bytes = uint_bytes(&signature.s);
    let sig_ref = SignatureRef {
        r: UintRef::new(&r_bytes).map_err(|_| Error::Der("invalid r component"))?,
        s: UintRef::new(&s_bytes).map_err(|_| Error::Der("invalid s component"))?,
    };
    sig_ref.to_der().map_err(|_| Error::Der("DER encoding failed"))
}

/// Decode a DER `SEQUENCE { INTEGER r, INTEGER s }` into a [`Signature`].
pub fn decode_signature(input: &[u8]) -> Result<Signature> {
    let sig_ref = SignatureRef::from_der(input).map_err(|_| Error::Der("malformed DER signature"))?;
    Ok(Signature {
        r: BigUint::from_bytes_be(sig_ref.r.as_bytes()),
        s: BigUint::from_bytes_be(sig_ref.s.as_bytes()),
    })
}
