use crate::error::{ErrorKind, IoError, IoOperation, IoResult};
use crate::net::socket::Socket;
use itertools::Itertools;
use nix::libc;
use nix::Error;
use socket2::{Domain, MaybeUninitSlice, MsgHdrMut, Protocol, SockAddr, Type};
use std::io;
use std::mem::{self, MaybeUninit};
use std::net::{Ipv6Addr, SocketAddr};
use std::ptr;
use std::time::Duration;
use tracing::instrument;

/// The size of the buffer for ancillary data received alongside a datagram.
const CONTROL_BUFFER_SIZE: usize = 64;

/// A raw network socket.
pub struct SocketImpl {
    inner: socket2::Socket,
}

impl SocketImpl {
    fn new_raw(domain: Domain, protocol: Protocol) -> IoResult<Self> {
        Ok(Self {
            inner: socket2::Socket::new(domain, Type::RAW, Some(protocol))
                .map_err(|err| IoError::Other(err, IoOperation::NewSocket))?,
        })
    }
}

impl Socket for SocketImpl {
    #[instrument(level = "trace")]
    fn new_icmp_socket_ipv4() -> IoResult<Self> {
        Self::new_raw(Domain::IPV4, Protocol::ICMPV4)
    }
    #[instrument(level = "trace")]
    fn new_icmp_socket_ipv6() -> IoResult<Self> {
        let socket = Self::new_raw(Domain::IPV6, Protocol::ICMPV6)?;
        socket
            .inner
            .set_recv_hoplimit_v6(true)
            .map_err(|err| IoError::Other(err, IoOperation::SetRecvHopLimit))?;
        Ok(socket)
    }
    #[instrument(skip(self, buf), level = "trace")]
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> IoResult<()> {
        tracing::trace!(buf = format!("{:02x?}", buf.iter().format(" ")), ?addr);
        self.inner
            .send_to(buf, &SockAddr::from(addr))
            .map_err(|err| IoError::SendTo(err, addr))?;
        Ok(())
    }
    #[instrument(skip(self), level = "trace")]
    fn set_read_timeout(&self, timeout: Duration) -> IoResult<()> {
        self.inner
            .set_read_timeout(Some(timeout))
            .map_err(|err| IoError::Other(err, IoOperation::SetReadTimeout))
    }
    #[instrument(skip(self, buf), level = "trace")]
    fn recv_from(&self, buf: &mut [u8]) -> IoResult<(usize, Option<SocketAddr>)> {
        let (bytes_read, addr) = self
            .inner
            .recv_from_into_buf(buf)
            .map_err(|err| IoError::Other(err, IoOperation::RecvFrom))?;
        tracing::trace!(
            buf = format!("{:02x?}", buf[..bytes_read].iter().format(" ")),
            bytes_read,
            ?addr
        );
        Ok((bytes_read, addr))
    }
    #[instrument(skip(self, buf), level = "trace")]
    fn recv_msg(&self, buf: &mut [u8]) -> IoResult<(usize, Option<SocketAddr>, Option<u8>)> {
        let (bytes_read, addr, hop_limit) = self
            .inner
            .recv_msg_into_buf(buf)
            .map_err(|err| IoError::Other(err, IoOperation::RecvMsg))?;
        tracing::trace!(
            buf = format!("{:02x?}", buf[..bytes_read].iter().format(" ")),
            bytes_read,
            ?addr,
            ?hop_limit
        );
        Ok((bytes_read, addr, hop_limit))
    }
}

impl From<&io::Error> for ErrorKind {
    fn from(value: &io::Error) -> Self {
        if value.raw_os_error() == io::Error::from(Error::ENOBUFS).raw_os_error() {
            Self::NoBufferSpace
        } else if value.raw_os_error() == io::Error::from(Error::EHOSTUNREACH).raw_os_error() {
            Self::HostUnreachable
        } else if value.raw_os_error() == io::Error::from(Error::ENETUNREACH).raw_os_error() {
            Self::NetUnreachable
        } else {
            Self::Std(value.kind())
        }
    }
}

// only used for unit tests
impl From<ErrorKind> for io::Error {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::NoBufferSpace => Self::from(Error::ENOBUFS),
            ErrorKind::HostUnreachable => Self::from(Error::EHOSTUNREACH),
            ErrorKind::NetUnreachable => Self::from(Error::ENETUNREACH),
            ErrorKind::Std(kind) => Self::from(kind),
        }
    }
}

/// An extension trait to allow `recv_from` method which writes to a `&mut [u8]`.
///
/// This is required for `socket2::Socket` which [does not currently provide] this method.
///
/// [does not currently provide]: https://github.com/rust-lang/socket2/issues/223
trait RecvFrom {
    fn recv_from_into_buf(&self, buf: &mut [u8]) -> io::Result<(usize, Option<SocketAddr>)>;
    /// Receive into `buf` along with the `IPV6_HOPLIMIT` ancillary data, if any.
    fn recv_msg_into_buf(
        &self,
        buf: &mut [u8],
    ) -> io::Result<(usize, Option<SocketAddr>, Option<u8>)>;
}

impl RecvFrom for socket2::Socket {
    // Safety: the `recv` implementation promises not to write uninitialised
    // bytes to the `buf`fer, so this casting is safe.
    #![allow(unsafe_code)]
    fn recv_from_into_buf(&self, buf: &mut [u8]) -> io::Result<(usize, Option<SocketAddr>)> {
        let buf = unsafe {
            &mut *(std::ptr::from_mut::<[u8]>(buf) as *mut [std::mem::MaybeUninit<u8>])
        };
        self.recv_from(buf)
            .map(|(size, addr)| (size, addr.as_socket()))
    }
    fn recv_msg_into_buf(
        &self,
        buf: &mut [u8],
    ) -> io::Result<(usize, Option<SocketAddr>, Option<u8>)> {
        let buf = unsafe { &mut *(ptr::from_mut::<[u8]>(buf) as *mut [MaybeUninit<u8>]) };
        let mut control = [0_u8; CONTROL_BUFFER_SIZE];
        // Safety: as above, `recvmsg` only writes initialised bytes to the control buffer.
        let control_buf = unsafe {
            &mut *(ptr::from_mut::<[u8]>(&mut control) as *mut [MaybeUninit<u8>])
        };
        let mut addr = SockAddr::from(SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)));
        let mut bufs = [MaybeUninitSlice::new(buf)];
        let mut msg = MsgHdrMut::new()
            .with_addr(&mut addr)
            .with_buffers(&mut bufs)
            .with_control(control_buf);
        let size = self.recvmsg(&mut msg, 0)?;
        let control_len = msg.control_len().min(CONTROL_BUFFER_SIZE);
        Ok((size, addr.as_socket(), hop_limit(&control[..control_len])))
    }
}

/// Find the hop limit in the ancillary data returned by `recvmsg`.
#[allow(unsafe_code, clippy::unnecessary_cast)]
fn hop_limit(control: &[u8]) -> Option<u8> {
    // Safety: `CMSG_LEN` and `CMSG_SPACE` only compute lengths.
    let data_offset = unsafe { libc::CMSG_LEN(0) } as usize;
    let mut offset = 0;
    while offset + mem::size_of::<libc::cmsghdr>() <= control.len() {
        // Safety: the header lies within `control` and is read unaligned.
        let cmsg = unsafe {
            ptr::read_unaligned(control[offset..].as_ptr().cast::<libc::cmsghdr>())
        };
        let cmsg_len = cmsg.cmsg_len as usize;
        if cmsg_len < data_offset || offset + cmsg_len > control.len() {
            return None;
        }
        if cmsg.cmsg_level == libc::IPPROTO_IPV6 && cmsg.cmsg_type == libc::IPV6_HOPLIMIT {
            let data = control.get(offset + data_offset..offset + data_offset + 4)?;
            let hop_limit = libc::c_int::from_ne_bytes(data.try_into().ok()?);
            return u8::try_from(hop_limit).ok();
        }
        // Safety: as above.
        offset += unsafe { libc::CMSG_SPACE((cmsg_len - data_offset) as libc::c_uint) } as usize;
    }
    None
}
