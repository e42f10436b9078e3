//! SSH wire format reading/writing.
//!
//! Implements the RFC4251 primitive encodings used by the
//! [`packet`](crate::packets) definitions and the
//! [`keyfile`](crate::keyfile) parser.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use core::fmt::{self, Debug};
use core::str;

use pretty_hex::PrettyHex;

use ascii::{AsAsciiStr, AsciiChar, AsciiStr};

use crate::*;
use packets::Packet;

/// A generic destination for serializing, used similarly to `serde::Serializer`
pub trait SSHSink {
    fn push(&mut self, v: &[u8]) -> WireResult<()>;
}

/// A generic source for a packet, used similarly to `serde::Deserializer`
pub trait SSHSource<'de> {
    fn take(&mut self, len: usize) -> WireResult<&'de [u8]>;
    fn remaining(&self) -> usize;
    fn pos(&self) -> usize;

    /// Takes all bytes left in the source, possibly none.
    fn take_rest(&mut self) -> WireResult<&'de [u8]> {
        self.take(self.remaining())
    }
}

/// Encodes the type in SSH wire format
pub trait SSHEncode {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink;
}

/// Decodes `struct` and `enum`s
pub trait SSHDecode<'de>: Sized {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>;
}

/// A subset of [`Error`] for `SSHEncode` and `SSHDecode`.
///
/// Compiled code size is very sensitive to the size of this
/// enum so we avoid unused elements.
#[derive(Debug)]
pub enum WireError {
    NoRoom,

    RanOut,

    BadString,

    BadName,

    BadMpInt,

    CurveMismatch,

    SSHProtoError,

    Unsupported { what: &'static str },

    UnknownPacket { number: u8 },

    BadField { what: &'static str, pos: usize, reason: &'static str },
}

impl WireError {
    fn reason(&self) -> &'static str {
        match self {
            WireError::NoRoom => "no room",
            WireError::RanOut => "ran out of input",
            WireError::BadString => "bad string",
            WireError::BadName => "bad name",
            WireError::BadMpInt => "bad mpint",
            WireError::CurveMismatch => "curve name mismatch",
            WireError::SSHProtoError => "protocol error",
            WireError::Unsupported { .. } => "unsupported",
            WireError::UnknownPacket { .. } => "unknown packet",
            WireError::BadField { reason, .. } => reason,
        }
    }

    /// Labels a decode failure with the structural path of the field
    /// being decoded, for example `KexInit.mac_c2s`.
    ///
    /// The innermost label is kept, it names the most specific field.
    /// Errors that already identify their cause pass through.
    pub(crate) fn ctx(self, what: &'static str, pos: usize) -> WireError {
        match self {
            WireError::Unsupported { .. }
            | WireError::UnknownPacket { .. }
            | WireError::BadField { .. } => self,
            e => WireError::BadField { what, pos, reason: e.reason() },
        }
    }
}

impl From<WireError> for Error {
    fn from(w: WireError) -> Self {
        match w {
            WireError::NoRoom => Error::NoRoom,
            WireError::RanOut => Error::RanOut,
            WireError::BadString => Error::BadString,
            WireError::BadName => Error::BadName,
            WireError::BadMpInt => Error::BadMpInt,
            WireError::CurveMismatch => Error::CurveMismatch,
            WireError::SSHProtoError => Error::SSHProtoError,
            WireError::Unsupported { what } => Error::Unsupported { what },
            WireError::UnknownPacket { number } => Error::UnknownPacket { number },
            WireError::BadField { what, pos, reason } => {
                Error::BadField { what, pos, reason }
            }
        }
    }
}

pub type WireResult<T> = core::result::Result<T, WireError>;

///////////////////////////////////////////////

/// Parses a [`Packet`] from a borrowed `&[u8]` byte buffer.
///
/// The packet must consume the whole buffer, trailing bytes are an error.
pub fn packet_from_bytes<'a>(b: &'a [u8]) -> Result<Packet<'a>> {
    let mut s = DecodeBytes::new(b);
    let p = Packet::dec(&mut s)?;

    if s.remaining() == 0 {
        Ok(p)
    } else {
        trace!("{} extra bytes after packet", s.remaining());
        Err(Error::WrongPacketLength)
    }
}

pub fn read_ssh<'a, T: SSHDecode<'a>>(b: &'a [u8]) -> Result<T> {
    let mut s = DecodeBytes::new(b);
    Ok(T::dec(&mut s)?)
}

/// Decodes one field of a larger structure, labelling any failure with
/// the field's structural path.
pub(crate) fn dec_field<'de, T, S>(s: &mut S, what: &'static str) -> WireResult<T>
where
    T: SSHDecode<'de>,
    S: SSHSource<'de>,
{
    T::dec(s).map_err(|e| e.ctx(what, s.pos()))
}

pub fn write_ssh<T>(target: &mut [u8], value: &T) -> Result<usize>
where
    T: SSHEncode,
{
    let mut s = EncodeBytes { target, pos: 0 };
    value.enc(&mut s)?;
    Ok(s.pos)
}

/// Returns `WireError::NoRoom` if larger than `u32`
pub(crate) fn length_enc<T>(value: &T) -> WireResult<u32>
where
    T: SSHEncode,
{
    let mut s = EncodeLen { pos: 0 };
    value.enc(&mut s)?;
    s.pos.try_into().map_err(|_| WireError::NoRoom)
}

struct EncodeBytes<'a> {
    target: &'a mut [u8],
    pos: usize,
}

impl SSHSink for EncodeBytes<'_> {
    fn push(&mut self, v: &[u8]) -> WireResult<()> {
        if self.pos + v.len() > self.target.len() {
            return Err(WireError::NoRoom);
        }
        self.target[self.pos..self.pos + v.len()].copy_from_slice(v);
        self.pos += v.len();
        Ok(())
    }
}

struct EncodeLen {
    pos: usize,
}

impl SSHSink for EncodeLen {
    fn push(&mut self, v: &[u8]) -> WireResult<()> {
        self.pos += v.len();
        Ok(())
    }
}

pub(crate) struct DecodeBytes<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> DecodeBytes<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        DecodeBytes { input, pos: 0 }
    }
}

impl<'de> SSHSource<'de> for DecodeBytes<'de> {
    fn take(&mut self, len: usize) -> WireResult<&'de [u8]> {
        if len > self.input.len() {
            return Err(WireError::RanOut);
        }
        let t;
        (t, self.input) = self.input.split_at(len);
        self.pos += len;
        Ok(t)
    }

    fn remaining(&self) -> usize {
        self.input.len()
    }

    fn pos(&self) -> usize {
        self.pos
    }
}

///////////////////////////////////////////////

/// A SSH style binary string. Serialized as `u32` length followed by the bytes
/// of the slice.
/// Application API
#[derive(Clone, PartialEq)]
pub struct BinString<'a>(pub &'a [u8]);

impl<'a> AsRef<[u8]> for BinString<'a> {
    fn as_ref(&self) -> &'a [u8] {
        self.0
    }
}

impl Debug for BinString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinString(len={})", self.0.len())
    }
}

impl SSHEncode for BinString<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        (self.0.len() as u32).enc(s)?;
        self.0.enc(s)
    }
}

impl<'de> SSHDecode<'de> for BinString<'de> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let len = u32::dec(s)? as usize;
        Ok(BinString(s.take(len)?))
    }
}

/// A text string that may be presented to a user or used
/// for things such as a password, exec command, TCP hostname, etc.
///
/// The SSH protocol defines it to be UTF-8, though
/// in some applications it could be treated as ASCII-only.
/// The library treats it as an opaque `&[u8]`.
///
/// Note that SSH protocol identifiers in `Packet` etc
/// are `&str` rather than `TextString`, and always defined as ASCII.
/// Application API
#[derive(Clone, PartialEq, Copy)]
pub struct TextString<'a>(pub &'a [u8]);

impl<'a> TextString<'a> {
    /// Returns the UTF-8 decoded string, using [`core::str::from_utf8`]
    pub fn as_str(&self) -> Result<&'a str> {
        core::str::from_utf8(self.0).map_err(|_| Error::BadString)
    }

    pub fn as_ascii(&self) -> Result<&'a str> {
        self.0.as_ascii_str().map_err(|_| Error::BadString).map(|s| s.as_str())
    }
}

impl<'a> AsRef<[u8]> for TextString<'a> {
    fn as_ref(&self) -> &'a [u8] {
        self.0
    }
}

impl<'a> From<&'a str> for TextString<'a> {
    fn from(s: &'a str) -> Self {
        TextString(s.as_bytes())
    }
}

impl Debug for TextString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = core::str::from_utf8(self.0);
        if let Ok(s) = s {
            write!(f, "TextString(\"{}\")", s.escape_default())
        } else {
            write!(f, "TextString(not utf8!, {:#?})", self.0.hex_dump())
        }
    }
}

impl SSHEncode for TextString<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        (self.0.len() as u32).enc(s)?;
        self.0.enc(s)
    }
}

impl<'de> SSHDecode<'de> for TextString<'de> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let len = u32::dec(s)? as usize;
        Ok(TextString(s.take(len)?))
    }
}

/// A SSH mpint, a signed big integer in two's complement.
///
/// Stores the wire body without the length prefix. The encoding must be
/// minimal length. A `0x00` pad byte only appears when the following byte
/// has the high bit set (otherwise the value would read back negative),
/// RFC4251 section 5. Malformed encodings are rejected at decode, never
/// normalised.
#[derive(Clone, Copy, PartialEq)]
pub struct MpInt<'a>(pub &'a [u8]);

impl<'a> MpInt<'a> {
    /// Checks the minimal-length encoding rule.
    pub fn valid(b: &[u8]) -> bool {
        match b {
            [] => true,
            // positive pad byte must be required by the next byte
            [0x00, ..] => b.len() >= 2 && (b[1] & 0x80) != 0,
            // a leading 0xff with the next high bit set is a redundant
            // sign byte
            [0xff, n, ..] => (n & 0x80) == 0,
            _ => true,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.0.first().map_or(false, |b| (b & 0x80) != 0)
    }

    /// Returns the unsigned magnitude with any sign pad byte stripped.
    ///
    /// Fails for negative values, the cryptographic fields using mpint
    /// are all non-negative.
    pub fn magnitude(&self) -> Result<&'a [u8]> {
        if self.is_negative() {
            return Err(Error::BadMpInt);
        }
        match self.0 {
            [0x00, rest @ ..] => Ok(rest),
            b => Ok(b),
        }
    }
}

impl Debug for MpInt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MpInt(len={})", self.0.len())
    }
}

impl SSHEncode for MpInt<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        if !MpInt::valid(self.0) {
            return Err(WireError::BadMpInt);
        }
        (self.0.len() as u32).enc(s)?;
        self.0.enc(s)
    }
}

impl<'de> SSHDecode<'de> for MpInt<'de> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let b = BinString::dec(s)?;
        if !MpInt::valid(b.0) {
            trace!("rejecting non-minimal mpint {:?}", b.0.hex_dump());
            return Err(WireError::BadMpInt);
        }
        Ok(MpInt(b.0))
    }
}

/// A wrapper for a `u32` length prefixed data structure `B`, such as a public key blob
pub struct Blob<B>(pub B);

impl<B> AsRef<B> for Blob<B> {
    fn as_ref(&self) -> &B {
        &self.0
    }
}

impl<B: Clone> Clone for Blob<B> {
    fn clone(&self) -> Self {
        Blob(self.0.clone())
    }
}

impl<B: PartialEq> PartialEq for Blob<B> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<B: SSHEncode + Debug> Debug for Blob<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(len) = length_enc(&self.0) {
            write!(f, "Blob(len={len}, {:?})", self.0)
        } else {
            write!(f, "Blob(len>u32, {:?})", self.0)
        }
    }
}

impl<B: SSHEncode> SSHEncode for Blob<B> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        let len: u32 = length_enc(&self.0)?;
        len.enc(s)?;
        self.0.enc(s)
    }
}

impl<'de, B: SSHDecode<'de>> SSHDecode<'de> for Blob<B> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        // The inner structure parses from its own exact sub-buffer.
        // `take_rest` inside the blob (Unknown key algorithms etc)
        // then can't run past the blob's length.
        let len = u32::dec(s)? as usize;
        let data = s.take(len)?;
        let mut sub = DecodeBytes::new(data);
        let inner = B::dec(&mut sub)?;
        if sub.remaining() != 0 {
            trace!("{} bytes left inside a blob", sub.remaining());
            return Err(WireError::SSHProtoError);
        }
        Ok(Blob(inner))
    }
}

///////////////////////////////////////////////

impl SSHEncode for u8 {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        s.push(&[*self])
    }
}

impl SSHEncode for bool {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        (*self as u8).enc(s)
    }
}

impl SSHEncode for u32 {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        s.push(&self.to_be_bytes())
    }
}

// no length prefix
impl SSHEncode for &[u8] {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        s.push(self)
    }
}

// no length prefix
impl<const N: usize> SSHEncode for [u8; N] {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        s.push(self)
    }
}

impl SSHEncode for &str {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        let v = self.as_bytes();
        // length prefix
        (v.len() as u32).enc(s)?;
        s.push(v)
    }
}

impl<T: SSHEncode> SSHEncode for Option<T> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        if let Some(t) = self.as_ref() {
            t.enc(s)?;
        }
        Ok(())
    }
}

impl SSHEncode for &AsciiStr {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        let v = self.as_bytes();
        BinString(v).enc(s)
    }
}

impl<'de> SSHDecode<'de> for bool {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        Ok(u8::dec(s)? != 0)
    }
}

// #[inline] seems to decrease code size somehow

impl<'de> SSHDecode<'de> for u8 {
    #[inline]
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let t = s.take(core::mem::size_of::<u8>())?;
        // take() returned exactly the right length
        t.try_into().map(u8::from_be_bytes).map_err(|_| WireError::RanOut)
    }
}

impl<'de> SSHDecode<'de> for u32 {
    #[inline]
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let t = s.take(core::mem::size_of::<u32>())?;
        t.try_into().map(u32::from_be_bytes).map_err(|_| WireError::RanOut)
    }
}

/// Decodes a SSH name string. Must be ASCII
/// without control characters. RFC4251 section 6.
pub fn try_as_ascii(t: &[u8]) -> WireResult<&AsciiStr> {
    let n = t.as_ascii_str().map_err(|_| WireError::BadName)?;
    if n.chars().any(|ch| ch.is_ascii_control() || ch == AsciiChar::DEL) {
        return Err(WireError::BadName);
    }
    Ok(n)
}

pub fn try_as_ascii_str(t: &[u8]) -> WireResult<&str> {
    try_as_ascii(t).map(AsciiStr::as_str)
}

impl<'de: 'a, 'a> SSHDecode<'de> for &'a str {
    #[inline]
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let len = u32::dec(s)?;
        let t = s.take(len as usize)?;
        try_as_ascii_str(t)
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for &'de AsciiStr {
    fn dec<S>(s: &mut S) -> WireResult<&'de AsciiStr>
    where
        S: SSHSource<'de>,
    {
        let b: BinString = SSHDecode::dec(s)?;
        try_as_ascii(b.0)
    }
}

// "read all remaining bytes". Only valid as the trailing field of a
// message or blob.
impl<'de> SSHDecode<'de> for &'de [u8] {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        s.take_rest()
    }
}

impl<'de, const N: usize> SSHDecode<'de> for [u8; N] {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let mut l = [0u8; N];
        l.copy_from_slice(s.take(N)?);
        Ok(l)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::*;
    use log::trace;
    use packets::*;
    use pretty_hex::PrettyHex;
    use skerrylog::init_test_log;
    use sshwire::*;

    /// Checks that two items serialize the same
    pub fn assert_serialize_equal<T: SSHEncode>(p1: &T, p2: &T) {
        let mut buf1 = vec![99; 3000];
        let mut buf2 = vec![88; 3000];
        let l1 = write_ssh(&mut buf1, p1).unwrap();
        let l2 = write_ssh(&mut buf2, p2).unwrap();
        buf1.truncate(l1);
        buf2.truncate(l2);
        assert_eq!(buf1, buf2);
    }

    pub fn test_roundtrip(p: &Packet) {
        let mut buf = vec![99; 3000];
        let l = write_ssh(&mut buf, p).unwrap();
        buf.truncate(l);
        trace!("wrote packet {:?}", buf.hex_dump());

        let p2 = packet_from_bytes(&buf).unwrap();
        trace!("returned packet {:#?}", p2);
        assert_serialize_equal(p, &p2);
    }

    #[test]
    fn mpint_roundtrip() {
        init_test_log();
        // zero is an empty body
        let zero = MpInt(&[]);
        // positive with a required pad byte
        let padded = MpInt(&[0x00, 0x80]);
        // negative, no pad
        let neg = MpInt(&[0xff, 0x21, 0x52, 0x41, 0x11]);
        for m in [&zero, &padded, &neg] {
            let mut buf = vec![0; 30];
            let l = write_ssh(&mut buf, m).unwrap();
            buf.truncate(l);
            assert_eq!(buf[..4], ((buf.len() - 4) as u32).to_be_bytes());
            let m2: MpInt = read_ssh(&buf).unwrap();
            assert_eq!(*m, m2);
        }
        assert_eq!(zero.magnitude().unwrap(), &[] as &[u8]);
        assert_eq!(padded.magnitude().unwrap(), &[0x80]);
        assert!(neg.magnitude().is_err());
    }

    #[test]
    fn mpint_rejects_non_minimal() {
        init_test_log();
        // leading zero not required by the next byte
        let mut buf = vec![0; 30];
        let l = write_ssh(&mut buf, &BinString(&[0x00, 0x7f])).unwrap();
        buf.truncate(l);
        assert!(matches!(read_ssh::<MpInt>(&buf), Err(Error::BadMpInt)));

        // redundant 0xff sign byte
        let mut buf = vec![0; 30];
        let l = write_ssh(&mut buf, &BinString(&[0xff, 0x80])).unwrap();
        buf.truncate(l);
        assert!(matches!(read_ssh::<MpInt>(&buf), Err(Error::BadMpInt)));

        // encode side checks too
        let mut buf = vec![0; 30];
        assert!(write_ssh(&mut buf, &MpInt(&[0x00, 0x01])).is_err());
    }

    #[test]
    fn truncated_input() {
        init_test_log();
        let buf = [0x00, 0x00, 0x00, 0x05, b'h', b'i'];
        assert!(matches!(read_ssh::<BinString>(&buf), Err(Error::RanOut)));
    }

    #[test]
    fn blob_length_must_match() {
        init_test_log();
        // Blob claims 6 bytes but the inner u32 only uses 4
        let buf = [0x00, 0x00, 0x00, 0x06, 1, 2, 3, 4, 5, 6];
        assert!(matches!(read_ssh::<Blob<u32>>(&buf), Err(Error::SSHProtoError)));

        let buf = [0x00, 0x00, 0x00, 0x04, 1, 2, 3, 4];
        let b: Blob<u32> = read_ssh(&buf).unwrap();
        assert_eq!(b.0, 0x01020304);
    }
}
