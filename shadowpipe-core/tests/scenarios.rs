//! End-to-end scenarios spanning the registry, shadow map and pipeline
//! together, as opposed to the unit tests within each module.

use std::{collections::VecDeque, os::fd::OwnedFd};

use shadowpipe_core::{
    config::{CompressionMode, LogLevel, Side},
    pipeline::Pipeline,
    shadow::construct_diff,
    Config,
};
use shadowpipe_protocol::{build_frame, encode_args, Argument};

fn config(side: Side) -> Config {
    Config {
        side,
        graphics_device: None,
        worker_count: 1,
        compression: CompressionMode::None,
        compression_level: 1,
        no_gpu: true,
        linear_dmabuf_only: false,
        log_level: LogLevel::Off,
    }
}

/// wl_display.get_registry -> wl_registry.bind x2 leaves the registry
/// holding exactly the expected objects.
#[test]
fn registry_handshake_populates_expected_objects() {
    let mut pipeline = Pipeline::new(&config(Side::Client));

    let get_registry = build_frame(1, 1, &encode_args(&[Argument::NewId(2)]));
    pipeline.outbound(&get_registry, VecDeque::new()).unwrap();

    let bind_shm = build_frame(
        2,
        0,
        &encode_args(&[Argument::NewIdDynamic {
            interface: "wl_shm".into(),
            version: 1,
            id: 3,
        }]),
    );
    let bind_compositor = build_frame(
        2,
        0,
        &encode_args(&[Argument::NewIdDynamic {
            interface: "wl_compositor".into(),
            version: 1,
            id: 4,
        }]),
    );
    pipeline.outbound(&bind_shm, VecDeque::new()).unwrap();
    pipeline.outbound(&bind_compositor, VecDeque::new()).unwrap();

    let registry = pipeline.registry();
    assert_eq!(registry.get(1).unwrap().interface.unwrap().name, "wl_display");
    assert_eq!(registry.get(2).unwrap().interface.unwrap().name, "wl_registry");
    assert_eq!(registry.get(3).unwrap().interface.unwrap().name, "wl_shm");
    assert_eq!(registry.get(4).unwrap().interface.unwrap().name, "wl_compositor");
}

/// A shm pool's fd, translated twice (e.g. because the application issued
/// two create_pool requests against dup'd copies of the same file), yields
/// the same remote id both times and the shadow's protocol refcount tracks
/// both bindings.
#[test]
fn shadow_double_translate_is_idempotent_and_refcounted() {
    let mut pipeline = Pipeline::new(&config(Side::Client));

    // Bind a wl_shm object through the normal handshake path rather than
    // poking the registry directly.
    pipeline
        .outbound(&build_frame(1, 1, &encode_args(&[Argument::NewId(2)])), VecDeque::new())
        .unwrap();
    pipeline
        .outbound(
            &build_frame(
                2,
                0,
                &encode_args(&[Argument::NewIdDynamic {
                    interface: "wl_shm".into(),
                    version: 1,
                    id: 4,
                }]),
            ),
            VecDeque::new(),
        )
        .unwrap();

    let tmp = tempfile::tempfile().unwrap();
    let dup: OwnedFd = tmp.try_clone().unwrap().into();
    let original: OwnedFd = tmp.into();

    let first = build_frame(4, 0, &encode_args(&[Argument::NewId(10), Argument::Int(4096)]));
    let mut fds = VecDeque::new();
    fds.push_back(original);
    pipeline.outbound(&first, fds).unwrap();

    let second = build_frame(4, 0, &encode_args(&[Argument::NewId(11), Argument::Int(4096)]));
    let mut fds2 = VecDeque::new();
    fds2.push_back(dup);
    pipeline.outbound(&second, fds2).unwrap();

    // Same underlying file -> one shadow, not two.
    assert_eq!(pipeline.shadows().len(), 1);
    let remote_id = match pipeline.registry().get(10).unwrap().payload {
        shadowpipe_core::registry::ObjectPayload::ShmPool { shadow_remote_id } => shadow_remote_id,
        _ => panic!("expected shm pool payload"),
    };
    assert_eq!(pipeline.shadows().get(remote_id).unwrap().protocol_refs, 2);
}

/// The word-aligned diff between two buffers that differ only in two small
/// clusters stays proportional to the number of changed words, not the
/// buffer size.
#[test]
fn diff_minimization_over_a_large_buffer() {
    let base = vec![0u8; 4096];
    let mut current = base.clone();
    for w in 128..132usize {
        current[w * 4..w * 4 + 4].copy_from_slice(&0xaau32.to_ne_bytes());
    }
    for w in 300..302usize {
        current[w * 4..w * 4 + 4].copy_from_slice(&0xbbu32.to_ne_bytes());
    }
    let diff = construct_diff(&base, &current, 0..4096);
    let payload_bytes: usize = diff.iter().map(|r| r.bytes.len()).sum();
    assert!(payload_bytes <= 24, "payload should cover only the 6 changed words");
}

/// A message carrying no fds for an interface outside the static table
/// forwards unchanged; the same interface with an fd-bearing message is
/// rejected instead of forwarded blind. The opaque object is reached by
/// binding a made-up interface name the static table does not know.
#[test]
fn unknown_interface_passthrough_rules() {
    let mut pipeline = Pipeline::new(&config(Side::Display));
    pipeline
        .outbound(&build_frame(1, 1, &encode_args(&[Argument::NewId(2)])), VecDeque::new())
        .unwrap();
    let bind_unknown = build_frame(
        2,
        0,
        &encode_args(&[Argument::NewIdDynamic {
            interface: "zwp_unknown_interface_v1".into(),
            version: 1,
            id: 50,
        }]),
    );
    // The bind itself is informational-error (unsupported interface) but
    // the id is still reserved opaquely.
    assert!(pipeline.outbound(&bind_unknown, VecDeque::new()).is_err());
    assert!(pipeline.registry().contains(50));
    assert!(pipeline.registry().get(50).unwrap().interface.is_none());

    let plain = build_frame(50, 2, &[1, 2, 3, 4]);
    let forwarded = pipeline.outbound(&plain, VecDeque::new()).unwrap().unwrap();
    assert_eq!(forwarded.record, plain);

    let tmp = tempfile::tempfile().unwrap();
    let fd: OwnedFd = tmp.into();
    let mut fds = VecDeque::new();
    fds.push_back(fd);
    let with_fd = build_frame(50, 2, &[]);
    assert!(pipeline.outbound(&with_fd, fds).is_err());
}

/// A file shadow's mirror exactly matches the bytes written into the
/// original descriptor before translation.
#[test]
fn file_shadow_mirrors_original_content() {
    let mut pipeline = Pipeline::new(&config(Side::Client));
    pipeline
        .outbound(&build_frame(1, 1, &encode_args(&[Argument::NewId(2)])), VecDeque::new())
        .unwrap();
    pipeline
        .outbound(
            &build_frame(
                2,
                0,
                &encode_args(&[Argument::NewIdDynamic {
                    interface: "wl_shm".into(),
                    version: 1,
                    id: 4,
                }]),
            ),
            VecDeque::new(),
        )
        .unwrap();

    use std::io::{Seek, SeekFrom, Write};
    let mut tmp = tempfile::tempfile().unwrap();
    let pattern = [0x98u8, 0xba, 0xdc, 0xfe];
    let content: Vec<u8> = pattern.iter().cycle().take(256).copied().collect();
    tmp.write_all(&content).unwrap();
    tmp.seek(SeekFrom::Start(0)).unwrap();
    let fd: OwnedFd = tmp.into();

    let create_pool = build_frame(4, 0, &encode_args(&[Argument::NewId(10), Argument::Int(256)]));
    let mut fds = VecDeque::new();
    fds.push_back(fd);
    pipeline.outbound(&create_pool, fds).unwrap();

    let remote_id = match pipeline.registry().get(10).unwrap().payload {
        shadowpipe_core::registry::ObjectPayload::ShmPool { shadow_remote_id } => shadow_remote_id,
        _ => panic!("expected shm pool payload"),
    };
    assert_eq!(pipeline.shadows().get(remote_id).unwrap().mirror, content);
}
