//! Parsers that recover structure from free-form model responses.
//!
//! Model output is unreliable in formatting (stray fences, echoed prompt
//! labels, wrapped lines), so each parser is maximally forgiving while
//! staying deterministic and idempotent. All three are total functions over
//! arbitrary text; "nothing recoverable" is an empty result, never an error.

pub mod n1;
pub mod n2;
pub mod n3;
