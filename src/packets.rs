//! SSH protocol packets.
//!
//! A [`Packet`] can be encoded/decoded to the
//! SSH Binary Packet Protocol using [`sshwire`].
//! SSH packet format is described in [RFC4253](https://tools.ietf.org/html/rfc4253) SSH Transport.
//!
//! Some packets are only ever sent and some only received, so encode and
//! decode coverage is deliberately asymmetric. The unimplemented
//! direction returns [`WireError::Unsupported`] rather than being
//! omitted, see the per-struct impls.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use core::fmt;

use pretty_hex::PrettyHex;

use crate::*;
use namelist::NameList;
use sshnames::*;
use sshwire::{dec_field, BinString, Blob, MpInt, TextString};
use sshwire::{SSHDecode, SSHEncode, SSHSink, SSHSource, WireError, WireResult};

/// Implements [`SSHEncode`] and [`SSHDecode`] for a struct, fields in
/// declaration order. Decode failures are labelled `Struct.field`.
/// Only for packets where both directions are supported, one-way
/// packets have explicit impls.
macro_rules! sshwire_fields {
    ($t:ident < $l:lifetime > { $($f:ident),* $(,)? }) => {
        impl SSHEncode for $t<'_> {
            fn enc<S>(&self, s: &mut S) -> WireResult<()>
            where S: SSHSink {
                $( self.$f.enc(s)?; )*
                let _ = s;
                Ok(())
            }
        }
        impl<'de: $l, $l> SSHDecode<'de> for $t<$l> {
            fn dec<S>(s: &mut S) -> WireResult<Self>
            where S: SSHSource<'de> {
                let _ = &s;
                Ok(Self { $(
                    $f: dec_field(s,
                        concat!(stringify!($t), ".", stringify!($f)))?,
                )* })
            }
        }
    };
    ($t:ident { $($f:ident),* $(,)? }) => {
        impl SSHEncode for $t {
            fn enc<S>(&self, s: &mut S) -> WireResult<()>
            where S: SSHSink {
                $( self.$f.enc(s)?; )*
                let _ = s;
                Ok(())
            }
        }
        impl<'de> SSHDecode<'de> for $t {
            fn dec<S>(s: &mut S) -> WireResult<Self>
            where S: SSHSource<'de> {
                let _ = &s;
                Ok(Self { $(
                    $f: dec_field(s,
                        concat!(stringify!($t), ".", stringify!($f)))?,
                )* })
            }
        }
    };
}

#[derive(Debug)]
pub struct Disconnect<'a> {
    pub reason: u32,
    pub desc: TextString<'a>,
    pub lang: TextString<'a>,
}
sshwire_fields!(Disconnect<'a> { reason, desc, lang });

#[derive(Debug)]
pub struct Ignore<'a> {
    pub data: BinString<'a>,
}
sshwire_fields!(Ignore<'a> { data });

#[derive(Debug)]
pub struct Unimplemented {
    pub seq: u32,
}
sshwire_fields!(Unimplemented { seq });

/// Named to avoid clashing with [`fmt::Debug`]
#[derive(Debug)]
pub struct DebugPacket<'a> {
    pub always_display: bool,
    pub message: TextString<'a>,
    pub lang: TextString<'a>,
}
sshwire_fields!(DebugPacket<'a> { always_display, message, lang });

#[derive(Debug)]
pub struct ServiceRequest<'a> {
    pub name: &'a str,
}
sshwire_fields!(ServiceRequest<'a> { name });

#[derive(Debug)]
pub struct ServiceAccept<'a> {
    pub name: &'a str,
}
sshwire_fields!(ServiceAccept<'a> { name });

#[derive(Debug)]
pub struct KexInit<'a> {
    pub cookie: [u8; 16],
    pub kex: NameList<'a>,
    /// A list of signature algorithms
    ///
    /// RFC4253 refers to this as the host key algorithms, but actually they
    /// are signature algorithms.
    pub hostkey: NameList<'a>,
    pub cipher_c2s: NameList<'a>,
    pub cipher_s2c: NameList<'a>,
    pub mac_c2s: NameList<'a>,
    pub mac_s2c: NameList<'a>,
    pub comp_c2s: NameList<'a>,
    pub comp_s2c: NameList<'a>,
    pub lang_c2s: NameList<'a>,
    pub lang_s2c: NameList<'a>,
    pub first_follows: bool,
    pub reserved: u32,
}

impl SSHEncode for KexInit<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        self.cookie.enc(s)?;
        self.kex.enc(s)?;
        self.hostkey.enc(s)?;
        self.cipher_c2s.enc(s)?;
        self.cipher_s2c.enc(s)?;
        self.mac_c2s.enc(s)?;
        self.mac_s2c.enc(s)?;
        self.comp_c2s.enc(s)?;
        self.comp_s2c.enc(s)?;
        self.lang_c2s.enc(s)?;
        self.lang_s2c.enc(s)?;
        self.first_follows.enc(s)?;
        self.reserved.enc(s)
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for KexInit<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let k = KexInit {
            cookie: dec_field(s, "KexInit.cookie")?,
            kex: dec_field(s, "KexInit.kex")?,
            hostkey: dec_field(s, "KexInit.hostkey")?,
            cipher_c2s: dec_field(s, "KexInit.cipher_c2s")?,
            cipher_s2c: dec_field(s, "KexInit.cipher_s2c")?,
            mac_c2s: dec_field(s, "KexInit.mac_c2s")?,
            mac_s2c: dec_field(s, "KexInit.mac_s2c")?,
            comp_c2s: dec_field(s, "KexInit.comp_c2s")?,
            comp_s2c: dec_field(s, "KexInit.comp_s2c")?,
            lang_c2s: dec_field(s, "KexInit.lang_c2s")?,
            lang_s2c: dec_field(s, "KexInit.lang_s2c")?,
            first_follows: dec_field(s, "KexInit.first_follows")?,
            reserved: dec_field(s, "KexInit.reserved")?,
        };
        if k.reserved != 0 {
            trace!("KexInit reserved field is {}", k.reserved);
            return Err(WireError::SSHProtoError.ctx("KexInit.reserved", s.pos()));
        }
        Ok(k)
    }
}

#[derive(Debug)]
pub struct NewKeys {}
sshwire_fields!(NewKeys {});

#[derive(Debug)]
pub struct KexDHInit<'a> {
    pub e: MpInt<'a>,
}
sshwire_fields!(KexDHInit<'a> { e });

/// Sent by a server. This codec only assembles it, decode is the
/// client's side and isn't implemented.
#[derive(Debug)]
pub struct KexDHReply<'a> {
    pub k_s: Blob<PubKey<'a>>,
    pub f: MpInt<'a>,
    pub sig: Blob<Signature<'a>>,
}

impl SSHEncode for KexDHReply<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        self.k_s.enc(s)?;
        self.f.enc(s)?;
        self.sig.enc(s)
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for KexDHReply<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let _ = s;
        Err(WireError::Unsupported { what: "kexdh-reply decode" })
    }
}

/// Only received by a server, payload construction isn't implemented.
#[derive(Debug)]
pub struct UserauthRequest<'a> {
    pub username: TextString<'a>,
    pub service: &'a str,
    pub method: AuthMethod<'a>,
}

impl SSHEncode for UserauthRequest<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        let _ = s;
        Err(WireError::Unsupported { what: "userauth-request encode" })
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for UserauthRequest<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        Ok(UserauthRequest {
            username: dec_field(s, "UserauthRequest.username")?,
            service: dec_field(s, "UserauthRequest.service")?,
            method: dec_field(s, "UserauthRequest.method")?,
        })
    }
}

/// The method-specific part of a [`UserauthRequest`].
#[derive(Debug)]
pub enum AuthMethod<'a> {
    Password(MethodPassword<'a>),
    PubKey(MethodPubKey<'a>),
    None,
    Unknown(Unknown<'a>),
}

impl<'de: 'a, 'a> SSHDecode<'de> for AuthMethod<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let name = BinString::dec(s)?;
        match core::str::from_utf8(name.0).unwrap_or("") {
            SSH_AUTHMETHOD_PASSWORD => Ok(Self::Password(SSHDecode::dec(s)?)),
            SSH_AUTHMETHOD_PUBLICKEY => Ok(Self::PubKey(SSHDecode::dec(s)?)),
            SSH_NAME_NONE => Ok(Self::None),
            _ => {
                let u = Unknown(name.0);
                debug!("Unknown auth method \"{u}\"");
                let _ = s.take_rest()?;
                Ok(Self::Unknown(u))
            }
        }
    }
}

pub struct MethodPassword<'a> {
    pub change: bool,
    pub password: TextString<'a>,
}
sshwire_fields!(MethodPassword<'a> { change, password });

// Don't print password
impl fmt::Debug for MethodPassword<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodPassword")
            .field("change", &self.change)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct MethodPubKey<'a> {
    /// A signature algorithm name (not key algorithm name).
    pub sig_algo: &'a str,
    pub pubkey: Blob<PubKey<'a>>,
    pub sig: Option<Blob<Signature<'a>>>,
}

impl<'de: 'a, 'a> SSHDecode<'de> for MethodPubKey<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let sig: bool = dec_field(s, "MethodPubKey.sig")?;
        let sig_algo = dec_field(s, "MethodPubKey.sig_algo")?;
        let pubkey = dec_field(s, "MethodPubKey.pubkey")?;
        let sig = if sig { Some(dec_field(s, "MethodPubKey.sig")?) } else { None };
        Ok(Self { sig_algo, pubkey, sig })
    }
}

#[derive(Debug)]
pub struct UserauthFailure<'a> {
    pub methods: NameList<'a>,
    pub partial: bool,
}
sshwire_fields!(UserauthFailure<'a> { methods, partial });

#[derive(Debug)]
pub struct UserauthSuccess {}
sshwire_fields!(UserauthSuccess {});

#[derive(Debug)]
pub struct UserauthBanner<'a> {
    pub message: TextString<'a>,
    pub lang: TextString<'a>,
}
sshwire_fields!(UserauthBanner<'a> { message, lang });

#[derive(Debug)]
pub struct UserauthPkOk<'a> {
    pub algo: &'a str,
    pub key: Blob<PubKey<'a>>,
}
sshwire_fields!(UserauthPkOk<'a> { algo, key });

#[derive(Debug)]
pub struct GlobalRequest<'a> {
    pub name: &'a str,
    pub want_reply: bool,
    /// Request-specific data, kept raw.
    pub data: &'a [u8],
}
sshwire_fields!(GlobalRequest<'a> { name, want_reply, data });

#[derive(Debug)]
pub struct RequestSuccess<'a> {
    /// Response-specific data, kept raw. Often empty.
    pub data: &'a [u8],
}
sshwire_fields!(RequestSuccess<'a> { data });

#[derive(Debug)]
pub struct RequestFailure {}
sshwire_fields!(RequestFailure {});

/// Only received by a server, payload construction isn't implemented.
#[derive(Debug)]
pub struct ChannelOpen<'a> {
    // channel_type is implicit in ty below
    pub num: u32,
    pub initial_window: u32,
    pub max_packet: u32,
    pub ty: ChannelOpenType<'a>,
}

impl SSHEncode for ChannelOpen<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        let _ = s;
        Err(WireError::Unsupported { what: "channel-open encode" })
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for ChannelOpen<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        // the channel type string comes first on the wire
        let ty_name: BinString = dec_field(s, "ChannelOpen.channel_type")?;
        let num = dec_field(s, "ChannelOpen.num")?;
        let initial_window = dec_field(s, "ChannelOpen.initial_window")?;
        let max_packet = dec_field(s, "ChannelOpen.max_packet")?;
        let ty = ChannelOpenType::dec_named(ty_name.0, s)
            .map_err(|e| e.ctx("ChannelOpen.ty", s.pos()))?;
        Ok(ChannelOpen { num, initial_window, max_packet, ty })
    }
}

#[derive(Debug)]
pub enum ChannelOpenType<'a> {
    Session,
    X11(X11<'a>),
    ForwardedTcpip(ForwardedTcpip<'a>),
    DirectTcpip(DirectTcpip<'a>),
    Unknown(Unknown<'a>),
}

impl<'a> ChannelOpenType<'a> {
    fn dec_named<'de: 'a, S>(name: &'de [u8], s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        match core::str::from_utf8(name).unwrap_or("") {
            "session" => Ok(Self::Session),
            "x11" => Ok(Self::X11(SSHDecode::dec(s)?)),
            "forwarded-tcpip" => Ok(Self::ForwardedTcpip(SSHDecode::dec(s)?)),
            "direct-tcpip" => Ok(Self::DirectTcpip(SSHDecode::dec(s)?)),
            _ => {
                let u = Unknown(name);
                debug!("Unknown channel type \"{u}\"");
                let _ = s.take_rest()?;
                Ok(Self::Unknown(u))
            }
        }
    }
}

#[derive(Debug)]
pub struct X11<'a> {
    pub origin: TextString<'a>,
    pub origin_port: u32,
}
sshwire_fields!(X11<'a> { origin, origin_port });

#[derive(Debug)]
pub struct ForwardedTcpip<'a> {
    pub address: TextString<'a>,
    pub port: u32,
    pub origin: TextString<'a>,
    pub origin_port: u32,
}
sshwire_fields!(ForwardedTcpip<'a> { address, port, origin, origin_port });

#[derive(Debug)]
pub struct DirectTcpip<'a> {
    pub address: TextString<'a>,
    pub port: u32,
    pub origin: TextString<'a>,
    pub origin_port: u32,
}
sshwire_fields!(DirectTcpip<'a> { address, port, origin, origin_port });

#[derive(Debug)]
pub struct ChannelOpenConfirmation {
    pub num: u32,
    pub sender_num: u32,
    pub initial_window: u32,
    pub max_packet: u32,
}
sshwire_fields!(ChannelOpenConfirmation { num, sender_num, initial_window, max_packet });

#[derive(Debug)]
pub struct ChannelOpenFailure<'a> {
    pub num: u32,
    pub reason: u32,
    pub desc: TextString<'a>,
    pub lang: TextString<'a>,
}
sshwire_fields!(ChannelOpenFailure<'a> { num, reason, desc, lang });

#[derive(Debug)]
pub struct ChannelWindowAdjust {
    pub num: u32,
    pub adjust: u32,
}
sshwire_fields!(ChannelWindowAdjust { num, adjust });

#[derive(Debug)]
pub struct ChannelData<'a> {
    pub num: u32,
    pub data: BinString<'a>,
}
sshwire_fields!(ChannelData<'a> { num, data });

#[derive(Debug)]
pub struct ChannelDataExt<'a> {
    pub num: u32,
    pub code: u32,
    pub data: BinString<'a>,
}
sshwire_fields!(ChannelDataExt<'a> { num, code, data });

#[derive(Debug)]
pub struct ChannelEof {
    pub num: u32,
}
sshwire_fields!(ChannelEof { num });

#[derive(Debug)]
pub struct ChannelClose {
    pub num: u32,
}
sshwire_fields!(ChannelClose { num });

#[derive(Debug)]
pub struct ChannelSuccess {
    pub num: u32,
}
sshwire_fields!(ChannelSuccess { num });

#[derive(Debug)]
pub struct ChannelFailure {
    pub num: u32,
}
sshwire_fields!(ChannelFailure { num });

/// Only received by a server, payload construction isn't implemented.
#[derive(Debug)]
pub struct ChannelRequest<'a> {
    pub num: u32,
    pub want_reply: bool,
    pub req: ChannelReqType<'a>,
}

impl SSHEncode for ChannelRequest<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        let _ = s;
        Err(WireError::Unsupported { what: "channel-request encode" })
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for ChannelRequest<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let num = dec_field(s, "ChannelRequest.num")?;
        let req_name: BinString = dec_field(s, "ChannelRequest.request_type")?;
        let want_reply = dec_field(s, "ChannelRequest.want_reply")?;
        let req = ChannelReqType::dec_named(req_name.0, s)
            .map_err(|e| e.ctx("ChannelRequest.req", s.pos()))?;
        Ok(ChannelRequest { num, want_reply, req })
    }
}

/// Channel request types.
///
/// `x11-req`, `xon-xoff`, `signal`, `exit-status` and `exit-signal` are
/// recognized but their payloads aren't decoded, matching the coverage
/// actually exercised. Decoding one fails with an unsupported error.
#[derive(Debug)]
pub enum ChannelReqType<'a> {
    Pty(PtyReq<'a>),
    Env(Env<'a>),
    Shell,
    Exec(Exec<'a>),
    Subsystem(Subsystem<'a>),
    WinChange(WinChange),
    X11Req,
    XonXoff,
    Signal,
    ExitStatus,
    ExitSignal,
    Unknown(Unknown<'a>),
}

impl<'a> ChannelReqType<'a> {
    fn dec_named<'de: 'a, S>(name: &'de [u8], s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        match core::str::from_utf8(name).unwrap_or("") {
            "pty-req" => Ok(Self::Pty(SSHDecode::dec(s)?)),
            "env" => Ok(Self::Env(SSHDecode::dec(s)?)),
            "shell" => Ok(Self::Shell),
            "exec" => Ok(Self::Exec(SSHDecode::dec(s)?)),
            "subsystem" => Ok(Self::Subsystem(SSHDecode::dec(s)?)),
            "window-change" => Ok(Self::WinChange(SSHDecode::dec(s)?)),
            "x11-req" => Err(WireError::Unsupported { what: "x11-req channel request" }),
            "xon-xoff" => Err(WireError::Unsupported { what: "xon-xoff channel request" }),
            "signal" => Err(WireError::Unsupported { what: "signal channel request" }),
            "exit-status" => {
                Err(WireError::Unsupported { what: "exit-status channel request" })
            }
            "exit-signal" => {
                Err(WireError::Unsupported { what: "exit-signal channel request" })
            }
            _ => {
                let u = Unknown(name);
                debug!("Unknown channel request \"{u}\"");
                let _ = s.take_rest()?;
                Ok(Self::Unknown(u))
            }
        }
    }
}

/// The contents of a `"pty-req"` request.
#[derive(Debug)]
pub struct PtyReq<'a> {
    pub term: TextString<'a>,
    pub cols: u32,
    pub rows: u32,
    pub width: u32,
    pub height: u32,
    pub modes: BinString<'a>,
}
sshwire_fields!(PtyReq<'a> { term, cols, rows, width, height, modes });

#[derive(Debug)]
pub struct Env<'a> {
    pub name: TextString<'a>,
    pub value: TextString<'a>,
}
sshwire_fields!(Env<'a> { name, value });

#[derive(Debug)]
pub struct Exec<'a> {
    pub command: TextString<'a>,
}
sshwire_fields!(Exec<'a> { command });

#[derive(Debug)]
pub struct Subsystem<'a> {
    pub subsystem: TextString<'a>,
}
sshwire_fields!(Subsystem<'a> { subsystem });

#[derive(Debug, Clone)]
pub struct WinChange {
    pub cols: u32,
    pub rows: u32,
    pub width: u32,
    pub height: u32,
}
sshwire_fields!(WinChange { cols, rows, width, height });

///////////////////////////////////////////////

/// Named elliptic curves used with ECDSA, RFC5656.
///
/// Curve arithmetic is delegated to the p256/p384/p521 crates, this
/// enum only selects encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdsaCurve {
    NistP256,
    NistP384,
    NistP521,
}

impl EcdsaCurve {
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Self::NistP256 => SSH_NAME_ECDSA_256,
            Self::NistP384 => SSH_NAME_ECDSA_384,
            Self::NistP521 => SSH_NAME_ECDSA_521,
        }
    }

    /// The curve identifier embedded in key and signature blobs
    pub fn nist_name(&self) -> &'static str {
        match self {
            Self::NistP256 => SSH_CURVE_NISTP256,
            Self::NistP384 => SSH_CURVE_NISTP384,
            Self::NistP521 => SSH_CURVE_NISTP521,
        }
    }

    pub fn from_algorithm_name(name: &str) -> Option<Self> {
        match name {
            SSH_NAME_ECDSA_256 => Some(Self::NistP256),
            SSH_NAME_ECDSA_384 => Some(Self::NistP384),
            SSH_NAME_ECDSA_521 => Some(Self::NistP521),
            _ => None,
        }
    }
}

/// A public key, selected by algorithm identifier string.
///
/// Unknown algorithms decode into [`PubKey::Unknown`] which re-encodes
/// verbatim, for forward compatibility with newly invented key types.
#[derive(Debug, Clone, PartialEq)]
pub enum PubKey<'a> {
    Dss(DssPubKey<'a>),
    Rsa(RsaPubKey<'a>),
    Ecdsa(EcdsaPubKey<'a>),
    Ed25519(Ed25519PubKey<'a>),
    Unknown(UnknownKey<'a>),
}

impl<'a> PubKey<'a> {
    /// The algorithm name presented. May be invalid.
    pub fn algorithm_name(&self) -> Result<&'a str, &Unknown<'a>> {
        match self {
            PubKey::Dss(_) => Ok(SSH_NAME_DSS),
            PubKey::Rsa(_) => Ok(SSH_NAME_RSA),
            PubKey::Ecdsa(k) => Ok(k.curve.algorithm_name()),
            PubKey::Ed25519(_) => Ok(SSH_NAME_ED25519),
            PubKey::Unknown(u) => Err(&u.algo),
        }
    }
}

impl SSHEncode for PubKey<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        match self {
            PubKey::Dss(k) => {
                SSH_NAME_DSS.enc(s)?;
                k.enc(s)
            }
            PubKey::Rsa(k) => {
                SSH_NAME_RSA.enc(s)?;
                k.enc(s)
            }
            PubKey::Ecdsa(k) => {
                k.curve.algorithm_name().enc(s)?;
                k.enc(s)
            }
            PubKey::Ed25519(k) => {
                SSH_NAME_ED25519.enc(s)?;
                k.enc(s)
            }
            PubKey::Unknown(u) => u.enc(s),
        }
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for PubKey<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let name = BinString::dec(s)?;
        match core::str::from_utf8(name.0).unwrap_or("") {
            SSH_NAME_DSS => Ok(PubKey::Dss(SSHDecode::dec(s)?)),
            SSH_NAME_RSA => Ok(PubKey::Rsa(SSHDecode::dec(s)?)),
            SSH_NAME_ED25519 => Ok(PubKey::Ed25519(SSHDecode::dec(s)?)),
            n if EcdsaCurve::from_algorithm_name(n).is_some() => {
                let curve = EcdsaCurve::from_algorithm_name(n).trap_wire()?;
                Ok(PubKey::Ecdsa(EcdsaPubKey::dec_known_curve(curve, s)?))
            }
            _ => {
                let algo = Unknown(name.0);
                debug!("Unknown pubkey algorithm \"{algo}\"");
                Ok(PubKey::Unknown(UnknownKey { algo, data: s.take_rest()? }))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DssPubKey<'a> {
    pub p: MpInt<'a>,
    pub q: MpInt<'a>,
    pub g: MpInt<'a>,
    pub y: MpInt<'a>,
}
sshwire_fields!(DssPubKey<'a> { p, q, g, y });

#[derive(Debug, Clone, PartialEq)]
pub struct RsaPubKey<'a> {
    pub e: MpInt<'a>,
    pub n: MpInt<'a>,
}
sshwire_fields!(RsaPubKey<'a> { e, n });

#[derive(Debug, Clone, PartialEq)]
pub struct Ed25519PubKey<'a> {
    pub key: BinString<'a>,
}
sshwire_fields!(Ed25519PubKey<'a> { key });

/// An ECDSA public key.
///
/// The point is kept as raw SEC1 bytes, validation against the curve is
/// done by [`sign`](crate::sign) when key material is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct EcdsaPubKey<'a> {
    pub curve: EcdsaCurve,
    pub point: BinString<'a>,
}

impl SSHEncode for EcdsaPubKey<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        self.curve.nist_name().enc(s)?;
        self.point.enc(s)
    }
}

impl<'a> EcdsaPubKey<'a> {
    /// The curve is implied by the outer algorithm name. The embedded
    /// curve identifier must agree, mismatch is a hard error rather
    /// than trusting either copy.
    fn dec_known_curve<'de: 'a, S>(curve: EcdsaCurve, s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let embedded: &str = SSHDecode::dec(s)?;
        if embedded != curve.nist_name() {
            debug!(
                "ECDSA curve \"{embedded}\" doesn't match algorithm {}",
                curve.algorithm_name()
            );
            return Err(WireError::CurveMismatch);
        }
        Ok(EcdsaPubKey { curve, point: SSHDecode::dec(s)? })
    }
}

/// `ssh-dss` signatures are a fixed 40 byte string, two 20 byte
/// big-endian unsigned integers r and s. RFC4253 section 6.6.
pub const DSS_SIGNATURE_LEN: usize = 40;

/// A signature, mirroring the [`PubKey`] shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Signature<'a> {
    Dss(DssSig<'a>),
    Rsa(RsaSig<'a>),
    Ecdsa(EcdsaSig<'a>),
    Ed25519(Ed25519Sig<'a>),
    Unknown(UnknownKey<'a>),
}

impl<'a> Signature<'a> {
    /// The algorithm name presented. May be invalid.
    pub fn algorithm_name(&self) -> Result<&'a str, &Unknown<'a>> {
        match self {
            Signature::Dss(_) => Ok(SSH_NAME_DSS),
            Signature::Rsa(_) => Ok(SSH_NAME_RSA),
            Signature::Ecdsa(e) => Ok(e.curve.algorithm_name()),
            Signature::Ed25519(_) => Ok(SSH_NAME_ED25519),
            Signature::Unknown(u) => Err(&u.algo),
        }
    }
}

impl SSHEncode for Signature<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        match self {
            Signature::Dss(k) => {
                SSH_NAME_DSS.enc(s)?;
                k.enc(s)
            }
            Signature::Rsa(k) => {
                SSH_NAME_RSA.enc(s)?;
                k.enc(s)
            }
            Signature::Ecdsa(k) => {
                k.curve.algorithm_name().enc(s)?;
                k.enc(s)
            }
            Signature::Ed25519(k) => {
                SSH_NAME_ED25519.enc(s)?;
                k.enc(s)
            }
            Signature::Unknown(u) => u.enc(s),
        }
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for Signature<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let name = BinString::dec(s)?;
        match core::str::from_utf8(name.0).unwrap_or("") {
            SSH_NAME_DSS => Ok(Signature::Dss(SSHDecode::dec(s)?)),
            SSH_NAME_RSA => Ok(Signature::Rsa(SSHDecode::dec(s)?)),
            SSH_NAME_ED25519 => Ok(Signature::Ed25519(SSHDecode::dec(s)?)),
            n if EcdsaCurve::from_algorithm_name(n).is_some() => {
                let curve = EcdsaCurve::from_algorithm_name(n).trap_wire()?;
                Ok(Signature::Ecdsa(EcdsaSig { curve, sig: SSHDecode::dec(s)? }))
            }
            _ => {
                let algo = Unknown(name.0);
                debug!("Unknown signature algorithm \"{algo}\"");
                Ok(Signature::Unknown(UnknownKey { algo, data: s.take_rest()? }))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DssSig<'a> {
    pub sig: BinString<'a>,
}

impl SSHEncode for DssSig<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        if self.sig.0.len() != DSS_SIGNATURE_LEN {
            return Err(WireError::SSHProtoError);
        }
        self.sig.enc(s)
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for DssSig<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where
        S: SSHSource<'de>,
    {
        let sig = BinString::dec(s)?;
        // the redundant length must be exactly 40
        if sig.0.len() != DSS_SIGNATURE_LEN {
            trace!("ssh-dss signature blob of {} bytes", sig.0.len());
            return Err(WireError::SSHProtoError);
        }
        Ok(DssSig { sig })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RsaSig<'a> {
    pub sig: BinString<'a>,
}
sshwire_fields!(RsaSig<'a> { sig });

#[derive(Debug, Clone, PartialEq)]
pub struct Ed25519Sig<'a> {
    pub sig: BinString<'a>,
}
sshwire_fields!(Ed25519Sig<'a> { sig });

/// ECDSA signature. The curve is carried by the outer algorithm name,
/// r and s are nested in their own length-prefixed blob, RFC5656 3.1.2.
#[derive(Debug, Clone, PartialEq)]
pub struct EcdsaSig<'a> {
    pub curve: EcdsaCurve,
    pub sig: Blob<EcdsaSigValue<'a>>,
}

impl SSHEncode for EcdsaSig<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        self.sig.enc(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EcdsaSigValue<'a> {
    pub r: MpInt<'a>,
    pub s: MpInt<'a>,
}
sshwire_fields!(EcdsaSigValue<'a> { r, s });

/// An unknown algorithm's key or signature, preserved verbatim.
///
/// `data` is the remainder of the enclosing blob after the algorithm
/// name, uninterpreted. Round-trips so that an unknown algorithm can be
/// carried through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownKey<'a> {
    pub algo: Unknown<'a>,
    pub data: &'a [u8],
}

impl SSHEncode for UnknownKey<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where
        S: SSHSink,
    {
        BinString(self.algo.0).enc(s)?;
        self.data.enc(s)
    }
}

/// Placeholder for unknown method names. These are sometimes non-fatal and
/// need to be handled by the relevant code, for example newly invented pubkey types.
#[derive(Clone, PartialEq)]
pub struct Unknown<'a>(pub &'a [u8]);

impl fmt::Display for Unknown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(s) = sshwire::try_as_ascii_str(self.0) {
            f.write_str(s)
        } else {
            write!(f, "non-ascii {:?}", self.0.hex_dump())
        }
    }
}

impl fmt::Debug for Unknown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

// Option::trap() returns crate::Error, this is the WireResult equivalent.
trait TrapWire<T> {
    fn trap_wire(self) -> WireResult<T>;
}

impl<T> TrapWire<T> for Option<T> {
    fn trap_wire(self) -> WireResult<T> {
        self.ok_or(WireError::SSHProtoError)
    }
}

/// We have repeated `match` statements for the various packet types, use a macro
macro_rules! messagetypes {
    (
        $( ( $message_num:literal,
            $SpecificPacketVariant:ident,
            $SpecificPacketType:ty,
            $SSH_MESSAGE_NAME:ident
            ),
             )*
    ) => {


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum MessageNumber {
    // variants are eg
    // SSH_MSG_KEXINIT = 20,
    $(
    $SSH_MESSAGE_NAME = $message_num,
    )*
}

impl TryFrom<u8> for MessageNumber {
    type Error = Error;
    fn try_from(v: u8) -> Result<Self> {
        match v {
            // eg
            // 20 = Ok(MessageNumber::SSH_MSG_KEXINIT)
            $(
            $message_num => Ok(MessageNumber::$SSH_MESSAGE_NAME),
            )*
            _ => {
                Err(Error::UnknownPacket { number: v })
            }
        }
    }
}

impl SSHEncode for Packet<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where S: SSHSink {
        let t = self.message_num() as u8;
        t.enc(s)?;
        match self {
            // eg
            // Packet::KexInit(p) => {
            // ...
            $(
            Packet::$SpecificPacketVariant(p) => {
                p.enc(s)?
            }
            )*
        };
        Ok(())
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for Packet<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where S: SSHSource<'de> {
        let msg_num = u8::dec(s)?;
        let ty = MessageNumber::try_from(msg_num);
        let ty = match ty {
            Ok(t) => t,
            Err(_) => return Err(WireError::UnknownPacket { number: msg_num })
        };

        // Decode based on the message number
        let p = match ty {
            // eg
            // MessageNumber::SSH_MSG_KEXINIT => Packet::KexInit(
            // ...
            $(
            MessageNumber::$SSH_MESSAGE_NAME => Packet::$SpecificPacketVariant(SSHDecode::dec(s)?),
            )*
        };
        Ok(p)
    }
}

/// Top level SSH packet enum
#[derive(Debug)]
pub enum Packet<'a> {
    // eg KexInit(KexInit<'a>),
    $(
    $SpecificPacketVariant($SpecificPacketType),
    )*
}

impl<'a> Packet<'a> {
    pub fn message_num(&self) -> MessageNumber {
        match self {
            // eg
            // Packet::KexInit() => {
            // ..
            $(
            Packet::$SpecificPacketVariant(_) => {
                MessageNumber::$SSH_MESSAGE_NAME
            }
            )*
        }
    }
}

$(
impl<'a> From<$SpecificPacketType> for Packet<'a> {
    fn from(s: $SpecificPacketType) -> Packet<'a> {
        Packet::$SpecificPacketVariant(s)
    }
}
)*

} } // macro

messagetypes![
(1, Disconnect, Disconnect<'a>, SSH_MSG_DISCONNECT),
(2, Ignore, Ignore<'a>, SSH_MSG_IGNORE),
(3, Unimplemented, Unimplemented, SSH_MSG_UNIMPLEMENTED),
(4, DebugPacket, DebugPacket<'a>, SSH_MSG_DEBUG),
(5, ServiceRequest, ServiceRequest<'a>, SSH_MSG_SERVICE_REQUEST),
(6, ServiceAccept, ServiceAccept<'a>, SSH_MSG_SERVICE_ACCEPT),
// 7        SSH_MSG_EXT_INFO       RFC 8308
(20, KexInit, KexInit<'a>, SSH_MSG_KEXINIT),
(21, NewKeys, NewKeys, SSH_MSG_NEWKEYS),
(30, KexDHInit, KexDHInit<'a>, SSH_MSG_KEXDH_INIT),
(31, KexDHReply, KexDHReply<'a>, SSH_MSG_KEXDH_REPLY),

(50, UserauthRequest, UserauthRequest<'a>, SSH_MSG_USERAUTH_REQUEST),
(51, UserauthFailure, UserauthFailure<'a>, SSH_MSG_USERAUTH_FAILURE),
(52, UserauthSuccess, UserauthSuccess, SSH_MSG_USERAUTH_SUCCESS),
(53, UserauthBanner, UserauthBanner<'a>, SSH_MSG_USERAUTH_BANNER),
(60, UserauthPkOk, UserauthPkOk<'a>, SSH_MSG_USERAUTH_PK_OK),

(80, GlobalRequest, GlobalRequest<'a>, SSH_MSG_GLOBAL_REQUEST),
(81, RequestSuccess, RequestSuccess<'a>, SSH_MSG_REQUEST_SUCCESS),
(82, RequestFailure, RequestFailure, SSH_MSG_REQUEST_FAILURE),

(90, ChannelOpen, ChannelOpen<'a>, SSH_MSG_CHANNEL_OPEN),
(91, ChannelOpenConfirmation, ChannelOpenConfirmation, SSH_MSG_CHANNEL_OPEN_CONFIRMATION),
(92, ChannelOpenFailure, ChannelOpenFailure<'a>, SSH_MSG_CHANNEL_OPEN_FAILURE),
(93, ChannelWindowAdjust, ChannelWindowAdjust, SSH_MSG_CHANNEL_WINDOW_ADJUST),
(94, ChannelData, ChannelData<'a>, SSH_MSG_CHANNEL_DATA),
(95, ChannelDataExt, ChannelDataExt<'a>, SSH_MSG_CHANNEL_EXTENDED_DATA),
(96, ChannelEof, ChannelEof, SSH_MSG_CHANNEL_EOF),
(97, ChannelClose, ChannelClose, SSH_MSG_CHANNEL_CLOSE),
(98, ChannelRequest, ChannelRequest<'a>, SSH_MSG_CHANNEL_REQUEST),
(99, ChannelSuccess, ChannelSuccess, SSH_MSG_CHANNEL_SUCCESS),
(100, ChannelFailure, ChannelFailure, SSH_MSG_CHANNEL_FAILURE),
];

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::namelist::NameList;
    use crate::packets;
    use crate::packets::*;
    use crate::skerrylog::init_test_log;
    use crate::sshnames::*;
    use crate::sshwire::tests::{assert_serialize_equal, test_roundtrip};
    use crate::sshwire::{packet_from_bytes, read_ssh, write_ssh};
    use crate::sshwire::{BinString, Blob, MpInt};

    pub(crate) fn put_u32(v: &mut Vec<u8>, x: u32) {
        v.extend_from_slice(&x.to_be_bytes());
    }

    pub(crate) fn put_str(v: &mut Vec<u8>, s: &[u8]) {
        put_u32(v, s.len() as u32);
        v.extend_from_slice(s);
    }

    fn encode_packet(p: &Packet) -> Vec<u8> {
        let mut buf = vec![99; 3000];
        let l = write_ssh(&mut buf, p).unwrap();
        buf.truncate(l);
        buf
    }

    #[test]
    /// check round trip of packet tags is a bijection
    fn packet_type() {
        let mut known = 0;
        for i in 0..=255 {
            let ty = packets::MessageNumber::try_from(i);
            if let Ok(ty) = ty {
                assert_eq!(i, ty as u8);
                known += 1;
            }
        }
        assert_eq!(known, 29);
    }

    #[test]
    fn roundtrip_transport() {
        init_test_log();
        test_roundtrip(&Disconnect {
            reason: 2,
            desc: "by application".into(),
            lang: "".into(),
        }.into());
        test_roundtrip(&Ignore { data: BinString(b"zzzz") }.into());
        test_roundtrip(&Unimplemented { seq: 33 }.into());
        test_roundtrip(&DebugPacket {
            always_display: true,
            message: "debugging".into(),
            lang: "".into(),
        }.into());
        test_roundtrip(&ServiceRequest { name: SSH_SERVICE_USERAUTH }.into());
        test_roundtrip(&ServiceAccept { name: SSH_SERVICE_CONNECTION }.into());
        test_roundtrip(&NewKeys {}.into());
    }

    #[test]
    fn roundtrip_kexinit() {
        init_test_log();
        let p = KexInit {
            cookie: [11; 16],
            kex: "curve25519-sha256,diffie-hellman-group14-sha256".try_into().unwrap(),
            hostkey: SSH_NAME_ED25519.try_into().unwrap(),
            cipher_c2s: "aes256-ctr".try_into().unwrap(),
            cipher_s2c: "aes256-ctr".try_into().unwrap(),
            mac_c2s: "hmac-sha2-256".try_into().unwrap(),
            mac_s2c: "hmac-sha2-256".try_into().unwrap(),
            comp_c2s: SSH_NAME_NONE.try_into().unwrap(),
            comp_s2c: SSH_NAME_NONE.try_into().unwrap(),
            lang_c2s: "".try_into().unwrap(),
            lang_s2c: "".try_into().unwrap(),
            first_follows: false,
            reserved: 0,
        }
        .into();
        test_roundtrip(&p);
    }

    #[test]
    fn kexinit_nonzero_reserved() {
        init_test_log();
        let p = KexInit {
            cookie: [0; 16],
            kex: NameList::empty(),
            hostkey: NameList::empty(),
            cipher_c2s: NameList::empty(),
            cipher_s2c: NameList::empty(),
            mac_c2s: NameList::empty(),
            mac_s2c: NameList::empty(),
            comp_c2s: NameList::empty(),
            comp_s2c: NameList::empty(),
            lang_c2s: NameList::empty(),
            lang_s2c: NameList::empty(),
            first_follows: false,
            reserved: 0,
        }
        .into();
        let mut buf = encode_packet(&p);
        // corrupt the trailing reserved field
        let l = buf.len();
        buf[l - 1] = 1;
        assert!(matches!(
            packet_from_bytes(&buf),
            Err(Error::BadField { what: "KexInit.reserved", .. })
        ));
    }

    #[test]
    /// A failed decode names the field that failed and where
    fn decode_errors_name_the_field() {
        init_test_log();
        // tag and cookie, then truncated inside the kex name-list
        let mut buf = vec![20u8];
        buf.extend_from_slice(&[0; 16]);
        buf.extend_from_slice(&[0, 0]);
        match packet_from_bytes(&buf) {
            Err(Error::BadField {
                what: "KexInit.kex",
                pos: 17,
                reason: "ran out of input",
            }) => (),
            o => panic!("wrong error {o:?}"),
        }

        // channel data cut off mid length field
        let buf = [94u8, 0, 0, 0];
        assert!(matches!(
            packet_from_bytes(&buf),
            Err(Error::BadField { what: "ChannelData.num", .. })
        ));

        // non-minimal mpint keeps its cause in the label
        let buf = [30u8, 0, 0, 0, 2, 0x00, 0x01];
        match packet_from_bytes(&buf) {
            Err(Error::BadField {
                what: "KexDHInit.e", reason: "bad mpint", ..
            }) => (),
            o => panic!("wrong error {o:?}"),
        }

        // the innermost field wins for nested structures
        let mut buf = vec![50u8];
        put_str(&mut buf, b"matt");
        put_str(&mut buf, b"ssh-connection");
        put_str(&mut buf, b"password");
        buf.push(0);
        buf.extend_from_slice(&[0, 0, 0, 20]);
        assert!(matches!(
            packet_from_bytes(&buf),
            Err(Error::BadField { what: "MethodPassword.password", .. })
        ));
    }

    #[test]
    fn roundtrip_kexdh_init() {
        init_test_log();
        test_roundtrip(&KexDHInit { e: MpInt(&[0x00, 0xc0, 0xff, 0xee]) }.into());
    }

    #[test]
    fn kexdh_reply_is_encode_only() {
        init_test_log();
        let p: Packet = KexDHReply {
            k_s: Blob(PubKey::Ed25519(Ed25519PubKey { key: BinString(&[17; 32]) })),
            f: MpInt(&[0x42]),
            sig: Blob(Signature::Ed25519(Ed25519Sig { sig: BinString(&[9; 64]) })),
        }
        .into();
        let buf = encode_packet(&p);
        assert_eq!(buf[0], 31);
        assert!(matches!(
            packet_from_bytes(&buf),
            Err(Error::Unsupported { what: "kexdh-reply decode" })
        ));
    }

    #[test]
    fn roundtrip_userauth_replies() {
        init_test_log();
        test_roundtrip(&UserauthFailure {
            methods: "publickey,password".try_into().unwrap(),
            partial: false,
        }.into());
        test_roundtrip(&UserauthSuccess {}.into());
        test_roundtrip(&UserauthBanner {
            message: "welcome aboard".into(),
            lang: "en".into(),
        }.into());
    }

    #[test]
    fn roundtrip_pk_ok() {
        init_test_log();
        for key in [
            PubKey::Ed25519(Ed25519PubKey { key: BinString(&[0x11; 32]) }),
            PubKey::Rsa(RsaPubKey { e: MpInt(&[0x01, 0x00, 0x01]), n: MpInt(&[0x00, 0xb3, 0x01]) }),
            PubKey::Dss(DssPubKey {
                p: MpInt(&[0x7f, 0x01]),
                q: MpInt(&[0x23]),
                g: MpInt(&[0x02]),
                y: MpInt(&[0x31, 0x41, 0x59]),
            }),
            PubKey::Ecdsa(EcdsaPubKey {
                curve: EcdsaCurve::NistP256,
                point: BinString(&[0x04; 65]),
            }),
        ] {
            let algo = key.algorithm_name().unwrap();
            test_roundtrip(&UserauthPkOk { algo, key: Blob(key) }.into());
        }
    }

    #[test]
    fn userauth_request_is_decode_only() {
        init_test_log();
        // password request off the wire
        let mut buf = vec![50u8];
        put_str(&mut buf, b"matt");
        put_str(&mut buf, b"ssh-connection");
        put_str(&mut buf, b"password");
        buf.push(0);
        put_str(&mut buf, b"hunter2");
        let p = packet_from_bytes(&buf).unwrap();
        match &p {
            Packet::UserauthRequest(UserauthRequest {
                username,
                service: "ssh-connection",
                method: AuthMethod::Password(m),
            }) => {
                assert_eq!(username.as_str().unwrap(), "matt");
                assert!(!m.change);
                assert_eq!(m.password.0, b"hunter2");
            }
            o => panic!("wrong decode {o:?}"),
        }

        // and it refuses to go back out
        let mut out = vec![0; 100];
        assert!(matches!(
            write_ssh(&mut out, &p),
            Err(Error::Unsupported { what: "userauth-request encode" })
        ));
    }

    #[test]
    fn userauth_request_pubkey_method() {
        init_test_log();
        let mut buf = vec![50u8];
        put_str(&mut buf, b"matt");
        put_str(&mut buf, b"ssh-connection");
        put_str(&mut buf, b"publickey");
        buf.push(1);
        put_str(&mut buf, b"ssh-ed25519");
        // pubkey blob
        let mut blob = Vec::new();
        put_str(&mut blob, b"ssh-ed25519");
        put_str(&mut blob, &[0x11; 32]);
        put_str(&mut buf, &blob);
        // sig blob
        let mut sig = Vec::new();
        put_str(&mut sig, b"ssh-ed25519");
        put_str(&mut sig, &[0x22; 64]);
        put_str(&mut buf, &sig);

        let p = packet_from_bytes(&buf).unwrap();
        assert!(matches!(
            p,
            Packet::UserauthRequest(UserauthRequest {
                method: AuthMethod::PubKey(MethodPubKey {
                    sig_algo: "ssh-ed25519",
                    pubkey: Blob(PubKey::Ed25519(_)),
                    sig: Some(_),
                }),
                ..
            })
        ));
    }

    #[test]
    fn roundtrip_global_requests() {
        init_test_log();
        test_roundtrip(&GlobalRequest {
            name: "tcpip-forward",
            want_reply: true,
            data: &[0, 0, 0, 4, b'h', b'o', b's', b't', 0, 0, 0x1f, 0x90],
        }.into());
        test_roundtrip(&RequestSuccess { data: &[] }.into());
        test_roundtrip(&RequestSuccess { data: &[0, 0, 0x1f, 0x90] }.into());
        test_roundtrip(&RequestFailure {}.into());
    }

    #[test]
    fn roundtrip_channel() {
        init_test_log();
        test_roundtrip(&ChannelOpenConfirmation {
            num: 0,
            sender_num: 3,
            initial_window: 200000,
            max_packet: 32768,
        }.into());
        test_roundtrip(&ChannelOpenFailure {
            num: 1,
            reason: ChanFail::SSH_OPEN_CONNECT_FAILED as u32,
            desc: "no route".into(),
            lang: "".into(),
        }.into());
        test_roundtrip(&ChannelWindowAdjust { num: 3, adjust: 70000 }.into());
        test_roundtrip(&ChannelData { num: 5, data: BinString(b"hello") }.into());
        test_roundtrip(&ChannelDataExt {
            num: 5,
            code: SSH_EXTENDED_DATA_STDERR,
            data: BinString(b"oops"),
        }.into());
        test_roundtrip(&ChannelEof { num: 9 }.into());
        test_roundtrip(&ChannelClose { num: 9 }.into());
        test_roundtrip(&ChannelSuccess { num: 2 }.into());
        test_roundtrip(&ChannelFailure { num: 2 }.into());
    }

    #[test]
    /// Checks the exact bytes of a channel data packet
    fn channel_data_wire_format() {
        init_test_log();
        let p: Packet = ChannelData { num: 5, data: BinString(b"hello") }.into();
        let buf = encode_packet(&p);
        let expect = [94, 0, 0, 0, 5, 0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o'];
        assert_eq!(buf, expect);

        let p2 = packet_from_bytes(&expect).unwrap();
        match p2 {
            Packet::ChannelData(ChannelData { num: 5, data }) => {
                assert_eq!(data.0, b"hello")
            }
            o => panic!("wrong decode {o:?}"),
        }
    }

    #[test]
    fn channel_open_is_decode_only() {
        init_test_log();
        let mut buf = vec![90u8];
        put_str(&mut buf, b"session");
        put_u32(&mut buf, 1);
        put_u32(&mut buf, 50000);
        put_u32(&mut buf, 16384);
        let p = packet_from_bytes(&buf).unwrap();
        assert!(matches!(
            p,
            Packet::ChannelOpen(ChannelOpen {
                num: 1,
                initial_window: 50000,
                max_packet: 16384,
                ty: ChannelOpenType::Session,
            })
        ));

        let mut out = vec![0; 100];
        assert!(matches!(
            write_ssh(&mut out, &p),
            Err(Error::Unsupported { what: "channel-open encode" })
        ));
    }

    #[test]
    fn channel_open_tcpip() {
        init_test_log();
        let mut buf = vec![90u8];
        put_str(&mut buf, b"direct-tcpip");
        put_u32(&mut buf, 2);
        put_u32(&mut buf, 4000);
        put_u32(&mut buf, 2000);
        put_str(&mut buf, b"localhost");
        put_u32(&mut buf, 8080);
        put_str(&mut buf, b"10.4.4.4");
        put_u32(&mut buf, 43210);
        let p = packet_from_bytes(&buf).unwrap();
        match p {
            Packet::ChannelOpen(ChannelOpen {
                ty: ChannelOpenType::DirectTcpip(d), ..
            }) => {
                assert_eq!(d.address.as_str().unwrap(), "localhost");
                assert_eq!(d.port, 8080);
                assert_eq!(d.origin_port, 43210);
            }
            o => panic!("wrong decode {o:?}"),
        }

        // unknown channel types are kept for the caller to reject
        let mut buf = vec![90u8];
        put_str(&mut buf, b"audio-stream");
        put_u32(&mut buf, 2);
        put_u32(&mut buf, 4000);
        put_u32(&mut buf, 2000);
        put_str(&mut buf, b"pulse");
        let p = packet_from_bytes(&buf).unwrap();
        assert!(matches!(
            p,
            Packet::ChannelOpen(ChannelOpen { ty: ChannelOpenType::Unknown(_), .. })
        ));
    }

    #[test]
    fn channel_request_decode() {
        init_test_log();
        let mut buf = vec![98u8];
        put_u32(&mut buf, 0);
        put_str(&mut buf, b"pty-req");
        buf.push(1);
        put_str(&mut buf, b"xterm-256color");
        put_u32(&mut buf, 80);
        put_u32(&mut buf, 24);
        put_u32(&mut buf, 640);
        put_u32(&mut buf, 480);
        put_str(&mut buf, &[]);
        let p = packet_from_bytes(&buf).unwrap();
        match &p {
            Packet::ChannelRequest(ChannelRequest {
                num: 0,
                want_reply: true,
                req: ChannelReqType::Pty(pty),
            }) => {
                assert_eq!(pty.term.as_str().unwrap(), "xterm-256color");
                assert_eq!(pty.cols, 80);
            }
            o => panic!("wrong decode {o:?}"),
        }

        let mut out = vec![0; 100];
        assert!(matches!(
            write_ssh(&mut out, &p),
            Err(Error::Unsupported { what: "channel-request encode" })
        ));

        // shell and exec
        let mut buf = vec![98u8];
        put_u32(&mut buf, 3);
        put_str(&mut buf, b"exec");
        buf.push(0);
        put_str(&mut buf, b"ls -l");
        let p = packet_from_bytes(&buf).unwrap();
        assert!(matches!(
            p,
            Packet::ChannelRequest(ChannelRequest { req: ChannelReqType::Exec(_), .. })
        ));
    }

    #[test]
    /// exit-status and friends are recognized but not decoded
    fn channel_request_unsupported_kinds() {
        init_test_log();
        for (kind, payload_len) in [
            (&b"exit-status"[..], 4usize),
            (b"signal", 8),
            (b"x11-req", 0),
            (b"xon-xoff", 1),
            (b"exit-signal", 12),
        ] {
            let mut buf = vec![98u8];
            put_u32(&mut buf, 0);
            put_str(&mut buf, kind);
            buf.push(0);
            buf.resize(buf.len() + payload_len, 0);
            assert!(
                matches!(packet_from_bytes(&buf), Err(Error::Unsupported { .. })),
                "{}",
                String::from_utf8_lossy(kind)
            );
        }

        // a name nobody knows decodes to Unknown instead
        let mut buf = vec![98u8];
        put_u32(&mut buf, 0);
        put_str(&mut buf, b"auth-agent-req@openssh.com");
        buf.push(0);
        let p = packet_from_bytes(&buf).unwrap();
        assert!(matches!(
            p,
            Packet::ChannelRequest(ChannelRequest { req: ChannelReqType::Unknown(_), .. })
        ));
    }

    #[test]
    fn unknown_packet_number() {
        init_test_log();
        let buf = [7u8, 0, 0, 0, 0];
        assert!(matches!(
            packet_from_bytes(&buf),
            Err(Error::UnknownPacket { number: 7 })
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        init_test_log();
        let mut buf = encode_packet(&ChannelEof { num: 1 }.into());
        buf.push(0);
        assert!(matches!(packet_from_bytes(&buf), Err(Error::WrongPacketLength)));
    }

    #[test]
    /// Unknown pubkey algorithms round-trip verbatim through the fallback
    fn unknown_pubkey_roundtrip() {
        init_test_log();
        let mut blob = Vec::new();
        put_str(&mut blob, b"sphincs+@example.org");
        blob.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef, 0x99]);

        let k: PubKey = read_ssh(&blob).unwrap();
        match &k {
            PubKey::Unknown(u) => {
                assert_eq!(u.algo.0, b"sphincs+@example.org");
                assert_eq!(u.data, &[0xde, 0xad, 0xbe, 0xef, 0x99]);
            }
            o => panic!("wrong decode {o:?}"),
        }

        let mut out = vec![0; 100];
        let l = write_ssh(&mut out, &k).unwrap();
        out.truncate(l);
        assert_eq!(out, blob);
    }

    #[test]
    fn ecdsa_curve_mismatch() {
        init_test_log();
        let mut blob = Vec::new();
        put_str(&mut blob, b"ecdsa-sha2-nistp256");
        put_str(&mut blob, b"nistp384");
        put_str(&mut blob, &[0x04; 97]);
        assert!(matches!(
            read_ssh::<PubKey>(&blob),
            Err(Error::CurveMismatch)
        ));
    }

    #[test]
    fn dss_signature_length() {
        init_test_log();
        let mut blob = Vec::new();
        put_str(&mut blob, b"ssh-dss");
        put_str(&mut blob, &[0x5a; 40]);
        let sig: Signature = read_ssh(&blob).unwrap();
        assert!(matches!(sig, Signature::Dss(_)));

        let mut blob = Vec::new();
        put_str(&mut blob, b"ssh-dss");
        put_str(&mut blob, &[0x5a; 41]);
        assert!(matches!(
            read_ssh::<Signature>(&blob),
            Err(Error::SSHProtoError)
        ));

        // encode side is checked too
        let bad = Signature::Dss(DssSig { sig: BinString(&[1; 39]) });
        let mut out = vec![0; 100];
        assert!(write_ssh(&mut out, &bad).is_err());
    }

    #[test]
    fn roundtrip_signatures() {
        init_test_log();
        let sigs = [
            Signature::Dss(DssSig { sig: BinString(&[0x5a; 40]) }),
            Signature::Rsa(RsaSig { sig: BinString(&[0x77; 128]) }),
            Signature::Ed25519(Ed25519Sig { sig: BinString(&[0x88; 64]) }),
            Signature::Ecdsa(EcdsaSig {
                curve: EcdsaCurve::NistP384,
                sig: Blob(EcdsaSigValue {
                    r: MpInt(&[0x12, 0x34]),
                    s: MpInt(&[0x00, 0xab, 0xcd]),
                }),
            }),
        ];
        for sig in &sigs {
            let mut buf = vec![0; 500];
            let l = write_ssh(&mut buf, sig).unwrap();
            buf.truncate(l);
            let sig2: Signature = read_ssh(&buf).unwrap();
            assert_serialize_equal(sig, &sig2);
        }
    }
}
