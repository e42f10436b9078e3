#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![forbid(unsafe_code)]
#![deny(unused_must_use)]

//! Codecs for the SSH protocol message layer and for OpenSSH private
//! key files.
//!
//! This crate is pure data transforms, it performs no I/O and keeps no
//! session state. [`packets`] defines the message types and their wire
//! codec, [`sshwire`] the RFC4251 primitives underneath, [`keyfile`]
//! parses `openssh-key-v1` files into [`sign::PrivKey`] material.

// base64 and the key handling allocate
extern crate alloc;

mod skerrylog;

pub mod error;
pub mod keyfile;
pub mod namelist;
pub mod packets;
pub mod sign;
pub mod sshnames;
pub mod sshwire;

pub use error::{Error, Result};
pub use packets::{Packet, PubKey, Signature};
pub use sign::PrivKey;
pub use sshwire::{
    packet_from_bytes, read_ssh, write_ssh, BinString, Blob, MpInt, TextString,
};
