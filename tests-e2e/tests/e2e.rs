//! True end-to-end tests: real OS pipes (anonymous `pipe(2)` fd pairs, one
//! per direction per slot, matching the fd pairs `ad` itself is handed per
//! §6 of the external interface) driving the actual `PipeRegistry` +
//! `Dispatcher` path the compiled binary uses.
//!
//! `tokio::net::unix::pipe::{Receiver, Sender}` only accept fds that are
//! actually FIFOs (`pipe(2)` output or a named pipe) — a `UnixStream`
//! socketpair fd is rejected at wrap time, so the harness mints real pipes
//! via `libc::pipe2` rather than a socketpair.
//!
//! Pipe layout used throughout: 0 = local app, 1 = cache, 2 = wire.

use std::io;
use std::os::fd::{FromRawFd, OwnedFd};
use std::path::PathBuf;
use std::time::Duration;

use allnetd_lib::packet::header::{
    HEADER_SIZE, MESSAGE_TYPE_DATA, MESSAGE_TYPE_MGMT, SIG_ALGO_NONE,
};
use allnetd_lib::packet::mgmt;
use allnetd_lib::pipes::{read_frame, write_frame};
use allnetd_lib::{Dispatcher, PipeRegistry, Scope, SocialTable};
use tokio::net::unix::pipe;

const PIPE_COUNT: usize = 3;

/// A single anonymous `pipe(2)` pair, split into its read and write ends.
fn anon_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0i32; 2];
    // SAFETY: `fds` is a valid pointer to two `c_int`s for `pipe2` to fill in;
    // the returned fds are immediately owned by `OwnedFd`, so nothing else
    // in this process holds or closes them independently.
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `pipe2` succeeded, so `fds[0]`/`fds[1]` are freshly-opened,
    // uniquely-owned file descriptors.
    unsafe { Ok((OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1]))) }
}

/// The peer side of one daemon pipe slot: the end the test drives directly,
/// writing stimulus into the daemon and reading what the daemon forwards
/// back out.
struct PeerPipe {
    tx: pipe::Sender,
    rx: pipe::Receiver,
}

/// The daemon's `PipeRegistry` wired to real pipe fds, with the peer end of
/// each slot kept open for the test to drive.
struct Harness {
    registry: PipeRegistry,
    peers: Vec<PeerPipe>,
}

async fn build_harness() -> Harness {
    let mut receivers = Vec::with_capacity(PIPE_COUNT);
    let mut senders = Vec::with_capacity(PIPE_COUNT);
    let mut peers = Vec::with_capacity(PIPE_COUNT);

    for _ in 0..PIPE_COUNT {
        // peer -> daemon
        let (daemon_read, peer_write) = anon_pipe().expect("create inbound pipe");
        // daemon -> peer
        let (peer_read, daemon_write) = anon_pipe().expect("create outbound pipe");

        receivers.push(pipe::Receiver::try_from(daemon_read).expect("wrap receiver"));
        senders.push(pipe::Sender::try_from(daemon_write).expect("wrap sender"));

        peers.push(PeerPipe {
            tx: pipe::Sender::try_from(peer_write).expect("wrap peer sender"),
            rx: pipe::Receiver::try_from(peer_read).expect("wrap peer receiver"),
        });
    }

    Harness { registry: PipeRegistry::new(receivers, senders), peers }
}

fn new_dispatcher() -> Dispatcher {
    Dispatcher::new(
        Duration::from_secs(60),
        100_000,
        Duration::from_secs(10),
        Duration::from_secs(1),
    )
}

async fn empty_social() -> SocialTable {
    SocialTable::init(30_000, 5, PathBuf::from("/nonexistent/allnet/contacts"))
}

fn data_packet(hops: u8, max_hops: u8, src_nbits: u8, dst_nbits: u8) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_SIZE];
    buf[0] = 4;
    buf[1] = MESSAGE_TYPE_DATA;
    buf[2] = hops;
    buf[3] = max_hops;
    buf[4] = src_nbits;
    buf[5] = dst_nbits;
    buf[6] = SIG_ALGO_NONE;
    buf.extend_from_slice(b"payload");
    buf
}

fn mgmt_packet(mtype: u8) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_SIZE];
    buf[0] = 4;
    buf[1] = MESSAGE_TYPE_MGMT;
    buf[6] = SIG_ALGO_NONE;
    buf.push(mtype);
    buf
}

/// Drive exactly one dispatch cycle: read the next ready frame off the
/// registry, dispatch it, and fan the result out to the scope's targets,
/// mirroring `daemon::handle_message` without needing the infinite loop's
/// signal-driven lifecycle.
async fn pump_one(
    harness: &mut Harness,
    dispatcher: &mut Dispatcher,
    social: &SocialTable,
) -> (Scope, u32) {
    let (payload, pipe_id, claimed_priority) =
        harness.registry.receive_any().await.expect("frame read");
    let is_local = pipe_id == 0 || pipe_id == 1;
    let snapshot = social.current();
    let outcome = dispatcher.dispatch(payload, is_local, claimed_priority, &snapshot);

    match outcome.scope {
        Scope::Drop => {}
        Scope::Local => {
            for target in 0..2 {
                harness.registry.send(target, &outcome.packet, 0).await;
            }
        }
        Scope::All => {
            for target in 0..PIPE_COUNT {
                harness.registry.send(target, &outcome.packet, outcome.priority).await;
            }
        }
    }
    (outcome.scope, outcome.priority)
}

async fn expect_frame(rx: &mut pipe::Receiver) -> (Vec<u8>, u32) {
    tokio::time::timeout(Duration::from_millis(200), read_frame(rx))
        .await
        .expect("expected a frame, timed out")
        .expect("frame read error")
}

async fn expect_silence(rx: &mut pipe::Receiver) {
    let result = tokio::time::timeout(Duration::from_millis(50), read_frame(rx)).await;
    assert!(result.is_err(), "expected no frame, but one arrived");
}

#[tokio::test]
async fn local_submission_floods_all_pipes_at_submitted_priority() {
    let mut harness = build_harness().await;
    let mut dispatcher = new_dispatcher();
    let social = empty_social().await;

    let packet = data_packet(0, 5, 16, 16);
    write_frame(&mut harness.peers[0].tx, &packet, 100).await.expect("write stimulus");

    let (scope, priority) = pump_one(&mut harness, &mut dispatcher, &social).await;
    assert_eq!(scope, Scope::All);
    assert_eq!(priority, 100);

    for target in 0..PIPE_COUNT {
        let (payload, prio) = expect_frame(&mut harness.peers[target].rx).await;
        assert_eq!(prio, 100);
        assert_eq!(payload[2], 0, "hops must be unchanged for a local submission");
    }
}

#[tokio::test]
async fn wire_resubmission_of_same_packet_is_dropped_as_duplicate() {
    let mut harness = build_harness().await;
    let mut dispatcher = new_dispatcher();
    let social = empty_social().await;

    let packet = data_packet(0, 5, 16, 16);
    write_frame(&mut harness.peers[2].tx, &packet, 0).await.expect("write first");
    pump_one(&mut harness, &mut dispatcher, &social).await;
    for target in 0..PIPE_COUNT {
        expect_frame(&mut harness.peers[target].rx).await;
    }

    write_frame(&mut harness.peers[2].tx, &packet, 0).await.expect("write duplicate");
    let (scope, _) = pump_one(&mut harness, &mut dispatcher, &social).await;
    assert_eq!(scope, Scope::Drop);

    for target in 0..PIPE_COUNT {
        expect_silence(&mut harness.peers[target].rx).await;
    }
}

#[tokio::test]
async fn wire_arrival_at_hop_ceiling_reaches_local_pipes_only() {
    let mut harness = build_harness().await;
    let mut dispatcher = new_dispatcher();
    let social = empty_social().await;

    let packet = data_packet(4, 5, 16, 16);
    write_frame(&mut harness.peers[2].tx, &packet, 0).await.expect("write stimulus");

    let (scope, priority) = pump_one(&mut harness, &mut dispatcher, &social).await;
    assert_eq!(scope, Scope::Local);
    assert_eq!(priority, 0);

    expect_frame(&mut harness.peers[0].rx).await;
    expect_frame(&mut harness.peers[1].rx).await;
    expect_silence(&mut harness.peers[2].rx).await;
}

#[tokio::test]
async fn wire_beacon_produces_no_output_on_any_pipe() {
    let mut harness = build_harness().await;
    let mut dispatcher = new_dispatcher();
    let social = empty_social().await;

    write_frame(&mut harness.peers[2].tx, &mgmt_packet(mgmt::BEACON), 0)
        .await
        .expect("write stimulus");

    let (scope, _) = pump_one(&mut harness, &mut dispatcher, &social).await;
    assert_eq!(scope, Scope::Drop);

    for target in 0..PIPE_COUNT {
        expect_silence(&mut harness.peers[target].rx).await;
    }
}

#[tokio::test]
async fn wire_trace_req_is_suppressed_then_resumes_after_grace() {
    let mut harness = build_harness().await;
    let mut dispatcher = new_dispatcher();
    let social = empty_social().await;

    write_frame(&mut harness.peers[2].tx, &mgmt_packet(mgmt::TRACE_REQ), 0)
        .await
        .expect("write first trace");
    let (first_scope, _) = pump_one(&mut harness, &mut dispatcher, &social).await;
    assert_eq!(first_scope, Scope::Local);
    expect_frame(&mut harness.peers[0].rx).await;
    expect_frame(&mut harness.peers[1].rx).await;
    expect_silence(&mut harness.peers[2].rx).await;

    // Grace period in `new_dispatcher` is 10s; production callers only see
    // the resumed path after that much wall-clock time passes, which this
    // test does not wait for. Asserting the immediate-suppression half of
    // the behavior here; `classify.rs` unit tests cover the grace expiry
    // with a fake clock.
}

#[tokio::test]
async fn wire_arrival_with_unverifiable_signature_still_forwards_at_anonymous_priority() {
    let mut harness = build_harness().await;
    let mut dispatcher = new_dispatcher();
    let social = empty_social().await;

    let mut packet = data_packet(0, 5, 16, 16);
    packet[6] = allnetd_lib::packet::header::SIG_ALGO_ED25519;
    packet.extend_from_slice(&[0u8; 64]);
    packet.extend_from_slice(&64u16.to_be_bytes());

    write_frame(&mut harness.peers[2].tx, &packet, 0).await.expect("write stimulus");

    let (scope, priority) = pump_one(&mut harness, &mut dispatcher, &social).await;
    assert_eq!(scope, Scope::All);
    assert!(priority > 0, "an unverified signature must not prevent forwarding");

    for target in 0..PIPE_COUNT {
        expect_frame(&mut harness.peers[target].rx).await;
    }
}
