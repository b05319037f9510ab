//! Message pipeline: wire parser, object-lifecycle dispatcher, and fd
//! rewriting.
//!
//! One [`Pipeline`] instance serves one side of the proxy (client-facing or
//! display-facing) and owns that side's registry, shadow-fd map and transfer
//! queue for the whole connection — both the request stream it forwards
//! outward and the event stream it forwards back use the same state, since
//! object ids and shadow fds are defined connection-wide, not per byte-flow
//! direction. A request and the event it eventually causes must agree on the
//! same object id, so splitting registries per byte-flow would desync them.

use std::{
    collections::VecDeque,
    ops::Range,
    os::fd::OwnedFd,
    sync::{Arc, Mutex},
};

use shadowpipe_protocol::{
    decode_args, header_length_valid, read_header, size_check, Argument, Interface, HEADER_LEN,
};
use tracing::{debug, warn};

use crate::{
    channel::{TransferQueue, UpdateHeader},
    compress::{self, Compressor},
    config::{Config, Side},
    error::{FrameError, HandlerError, PipelineError, WorkerError},
    gpu::{GraphicsBackend, NullGraphicsBackend},
    registry::{self, ObjectId, ObjectPayload, ObjectRegistry},
    shadow::{Category, ShadowMap, TranslateHint},
    workers::{Operation, Task, WorkerPool},
};

/// How many messages an object may remain a zombie for before the registry
/// slot is reclaimed. Fixed rather than driven by peer acks, since acks are
/// a channel-framing concern out of this crate's scope.
pub const ZOMBIE_IDLE_MESSAGES: u32 = 64;

/// A parsed, dispatched message ready to cross (or not cross) the channel.
#[derive(Debug)]
pub struct Outbound {
    /// The original frame bytes, unchanged, plus a trailer of one
    /// native-endian `i32` remote id per `Fd` argument in the signature, in
    /// signature order. The far side knows the trailer length from the same
    /// signature lookup, so no extra count travels on the wire.
    pub record: Vec<u8>,
    /// Content updates for shadows dirtied since the last call, compressed
    /// and ready to write as `IoSlice` groups immediately ahead of `record`.
    pub updates: Vec<(UpdateHeader, Vec<u8>)>,
}

/// The result of accepting a message arriving from the channel: the frame to
/// deliver locally, plus the real fds to pass alongside it (reconstructed
/// from their shadows).
pub struct Inbound {
    pub frame: Vec<u8>,
    pub fds: Vec<OwnedFd>,
}

pub struct Pipeline {
    registry: ObjectRegistry,
    shadows: ShadowMap,
    compressor: Arc<dyn Compressor>,
    gpu: Box<dyn GraphicsBackend>,
    workers: WorkerPool,
    transfer: Arc<Mutex<TransferQueue>>,
    messages_processed: u32,
    zombies: VecDeque<(ObjectId, u32)>,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        Self::with_backend(config, Box::new(NullGraphicsBackend))
    }

    pub fn with_backend(config: &Config, gpu: Box<dyn GraphicsBackend>) -> Self {
        let mut registry = ObjectRegistry::new();
        registry
            .insert(
                registry::from_wire(shadowpipe_protocol::DISPLAY_OBJECT_ID),
                &shadowpipe_protocol::WL_DISPLAY,
            )
            .expect("fresh registry accepts the implicit display object");

        Self {
            registry,
            shadows: ShadowMap::new(config.side()),
            compressor: Arc::from(compress::build(config.compression(), config.compression_level())),
            gpu,
            workers: WorkerPool::new(config.worker_count()),
            transfer: Arc::new(Mutex::new(TransferQueue::new())),
            messages_processed: 0,
            zombies: VecDeque::new(),
        }
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn shadows(&self) -> &ShadowMap {
        &self.shadows
    }

    pub fn compressor(&self) -> &dyn Compressor {
        self.compressor.as_ref()
    }

    /// Record a byte range of a translated shadow's local descriptor as
    /// changed since the last synchronization, so the next [`Self::outbound`]
    /// call picks it up via [`Self::sync_dirty_content`]. A caller notices
    /// this the way it notices any local fd activity — out of this crate's
    /// scope (no accept loop, no epoll) — and reports it here.
    pub fn mark_shadow_dirty(&mut self, remote_id: i32, range: Range<usize>) {
        self.shadows.mark_dirty(remote_id, range);
    }

    /// Diff or drain every shadow dirtied since the last call, compress each
    /// update on the worker pool, and queue the results for transmission.
    fn sync_dirty_content(&mut self) {
        let raw_updates = self.shadows.collect_updates();
        if raw_updates.is_empty() {
            return;
        }
        for (header, raw_payload) in raw_updates {
            let compressor = Arc::clone(&self.compressor);
            let transfer = Arc::clone(&self.transfer);
            let payload_len = raw_payload.len();
            self.workers.submit(Task {
                remote_id: header.remote_id,
                range: (0, payload_len),
                operation: Operation::DiffAndCompress,
                run: Box::new(move || {
                    let compressed = compressor.compress(&raw_payload)?;
                    let header = UpdateHeader {
                        size: compressed.len() as u32,
                        ..header
                    };
                    transfer
                        .lock()
                        .expect("transfer queue poisoned")
                        .push(header, compressed);
                    Ok(())
                }),
            });
        }
        self.workers.join();
    }

    /// Drain the updates queued by [`Self::sync_dirty_content`] so a caller
    /// can write them immediately ahead of the protocol message batch.
    fn drain_updates(&mut self) -> Vec<(UpdateHeader, Vec<u8>)> {
        self.transfer.lock().expect("transfer queue poisoned").drain_pairs()
    }

    /// Apply a content update frame arriving from the peer's transfer queue
    /// to the named shadow, decompressing on the worker pool first.
    pub fn receive_update(&mut self, header: UpdateHeader, payload: &[u8]) -> Result<(), PipelineError> {
        let expected_len = self
            .shadows
            .get(header.remote_id)
            .map(|s| s.mirror.len())
            .unwrap_or(payload.len());
        let compressor = Arc::clone(&self.compressor);
        let payload = payload.to_vec();
        let outcome: Arc<Mutex<Option<Result<Vec<u8>, String>>>> = Arc::new(Mutex::new(None));
        let outcome_slot = Arc::clone(&outcome);
        self.workers.submit(Task {
            remote_id: header.remote_id,
            range: (0, payload.len()),
            operation: Operation::DecompressAndApply,
            run: Box::new(move || {
                let result = compressor.decompress(&payload, expected_len);
                let stored = result.as_ref().map(|v| v.clone()).map_err(|e| e.to_string());
                *outcome_slot.lock().expect("decode outcome poisoned") = Some(stored);
                result.map(|_| ())
            }),
        });
        self.workers.join();
        let raw = outcome
            .lock()
            .expect("decode outcome poisoned")
            .take()
            .expect("worker always records an outcome")
            .map_err(WorkerError::Compression)?;
        self.shadows.apply_update(header, &raw)?;
        Ok(())
    }

    /// Process one frame traveling away from the locally-attached process
    /// (requests from the client app, or events from the compositor,
    /// depending on which side this pipeline runs as) toward the channel.
    pub fn outbound(
        &mut self,
        frame: &[u8],
        mut fds: VecDeque<OwnedFd>,
    ) -> Result<Option<Outbound>, PipelineError> {
        self.tick();
        let (header, payload) = split_frame(frame)?;
        let oid = registry::from_wire(header.object_id);

        let (interface, zombie) = match self.registry.get(oid) {
            Some(obj) => (obj.interface, obj.zombie),
            None => return Err(HandlerError::UnboundObject(header.object_id).into()),
        };

        let Some(interface) = interface else {
            if !fds.is_empty() {
                warn!(object_id = header.object_id, "dropping fd-bearing message for unknown interface");
                return Err(FrameError::FdOnUnknownInterface(fds.len()).into());
            }
            self.sync_dirty_content();
            let updates = self.drain_updates();
            return Ok(Some(Outbound {
                record: frame.to_vec(),
                updates,
            }));
        };

        let Some(desc) = interface.request(header.opcode) else {
            return Err(HandlerError::UnboundObject(header.object_id).into());
        };

        if !size_check(desc.signature, payload, fds.len()) {
            return Err(FrameError::SizeCheck(
                shadowpipe_protocol::ParseError::SizeMismatch,
            )
            .into());
        }
        let args = decode_args(desc.signature, payload).map_err(FrameError::SizeCheck)?;

        let mut fd_remote_ids = Vec::new();
        for arg in desc.signature {
            if matches!(arg, shadowpipe_protocol::ArgKind::Fd) {
                let fd = fds.pop_front().expect("size_check verified fd count");
                let remote_id = self.shadows.translate(fd, TranslateHint { graphics: None })?;
                self.shadows.increment_transfer(remote_id);
                fd_remote_ids.push(remote_id);
            }
        }

        if !zombie {
            if let Some(new_id_interface) = desc.new_id_interface {
                if let Some(new_id) = find_new_id(&args) {
                    self.registry
                        .insert(registry::from_wire(new_id), new_id_interface)
                        .map_err(|_| FrameError::DoubleBind(new_id))?;
                    self.link_special_case(interface, desc.name, oid, new_id, &fd_remote_ids);
                }
            } else if let Some((new_id, type_name)) = find_new_id_dynamic(&args) {
                match shadowpipe_protocol::find_interface(&type_name) {
                    Some(dynamic_interface) => {
                        self.registry
                            .insert(registry::from_wire(new_id), dynamic_interface)
                            .map_err(|_| FrameError::DoubleBind(new_id))?;
                    }
                    None => {
                        debug!(interface = %type_name, "binding unknown interface opaquely");
                        self.registry
                            .insert_opaque(registry::from_wire(new_id))
                            .map_err(|_| FrameError::DoubleBind(new_id))?;
                        return Err(HandlerError::UnsupportedDynamicInterface(type_name).into());
                    }
                }
            }

            if desc.is_destructor {
                self.handle_destructor(oid)?;
            }
        }

        let mut record = frame.to_vec();
        for &remote_id in &fd_remote_ids {
            record.extend_from_slice(&(remote_id as u32).to_ne_bytes());
        }
        self.shadows.decref_transferred_rids(&fd_remote_ids);

        self.sync_dirty_content();
        let updates = self.drain_updates();
        Ok(Some(Outbound { record, updates }))
    }

    /// Process one record arriving from the channel (events in the common
    /// case), reconstructing real fds from their shadows before handing the
    /// frame to the locally-attached process.
    pub fn inbound(&mut self, record: &[u8]) -> Result<Inbound, PipelineError> {
        self.tick();
        let (header, payload) = split_frame(record)?;
        let oid = registry::from_wire(header.object_id);

        let interface = match self.registry.get(oid) {
            Some(obj) => obj.interface,
            None => return Err(HandlerError::UnboundObject(header.object_id).into()),
        };

        let Some(interface) = interface else {
            return Ok(Inbound {
                frame: record[..header.length as usize].to_vec(),
                fds: Vec::new(),
            });
        };

        let Some(desc) = interface.event(header.opcode) else {
            return Err(HandlerError::UnboundObject(header.object_id).into());
        };

        let fd_slots = desc
            .signature
            .iter()
            .filter(|a| matches!(a, shadowpipe_protocol::ArgKind::Fd))
            .count();
        let trailer_start = header.length as usize;
        let trailer_len = fd_slots * 4;
        if record.len() < trailer_start + trailer_len {
            return Err(FrameError::SizeCheck(shadowpipe_protocol::ParseError::Truncated).into());
        }
        if !size_check(desc.signature, payload, fd_slots) {
            return Err(FrameError::SizeCheck(
                shadowpipe_protocol::ParseError::SizeMismatch,
            )
            .into());
        }

        let mut fds = Vec::with_capacity(fd_slots);
        let mut remote_ids = Vec::with_capacity(fd_slots);
        for i in 0..fd_slots {
            let off = trailer_start + i * 4;
            let remote_id =
                i32::from_ne_bytes(record[off..off + 4].try_into().unwrap());
            let fd = self.reconstruct_fd(remote_id)?;
            fds.push(fd);
            remote_ids.push(remote_id);
        }

        let args = decode_args(desc.signature, payload).map_err(FrameError::SizeCheck)?;
        if interface.name == "wl_display" && desc.name == "delete_id" {
            if let Some(Argument::Uint(id)) = args.first() {
                let _ = self.registry.remove(registry::from_wire(*id));
            }
        }

        self.shadows.decref_transferred_rids(&remote_ids);

        Ok(Inbound {
            frame: record[..trailer_start].to_vec(),
            fds,
        })
    }

    fn reconstruct_fd(&mut self, remote_id: i32) -> Result<OwnedFd, PipelineError> {
        use crate::error::FdError;
        let category = self
            .shadows
            .get(remote_id)
            .map(|s| s.category)
            .unwrap_or(Category::Unknown);
        let mirror_len = self.shadows.get(remote_id).map(|s| s.mirror.len()).unwrap_or(0);
        self.shadows.placeholder(remote_id, category, mirror_len);

        let fd = match category {
            Category::File => {
                use std::os::fd::AsRawFd;
                let name = std::ffi::CString::new(format!("shadowpipe-{remote_id}")).unwrap();
                let memfd = nix::sys::memfd::memfd_create(&name, nix::sys::memfd::MemFdCreateFlag::empty())
                    .map_err(|e| FdError::Reconstruct(std::io::Error::from(e)))?;
                if let Some(shadow) = self.shadows.get(remote_id) {
                    nix::unistd::write(memfd.as_raw_fd(), &shadow.mirror)
                        .map_err(|e| FdError::Reconstruct(std::io::Error::from(e)))?;
                    nix::unistd::lseek(memfd.as_raw_fd(), 0, nix::unistd::Whence::SeekSet)
                        .map_err(|e| FdError::Reconstruct(std::io::Error::from(e)))?;
                }
                memfd
            }
            Category::PipeReadable | Category::PipeWritable | Category::PipeBidirectional => {
                use std::os::fd::FromRawFd;
                let (read_end, write_end) =
                    nix::unistd::pipe().map_err(|e| FdError::Reconstruct(std::io::Error::from(e)))?;
                drop(write_end);
                unsafe { OwnedFd::from_raw_fd(read_end) }
            }
            Category::GraphicsBuffer | Category::Unknown => {
                let name = std::ffi::CString::new(format!("shadowpipe-opaque-{remote_id}")).unwrap();
                nix::sys::memfd::memfd_create(&name, nix::sys::memfd::MemFdCreateFlag::empty())
                    .map_err(|e| FdError::Reconstruct(std::io::Error::from(e)))?
            }
        };
        self.shadows.increment_transfer(remote_id);
        Ok(fd)
    }

    fn handle_destructor(&mut self, oid: ObjectId) -> Result<(), PipelineError> {
        if let Some(obj) = self.registry.get(oid) {
            if obj.zombie {
                return Ok(());
            }
            if let ObjectPayload::ShmPool { shadow_remote_id } = obj.payload {
                self.shadows.decref_protocol(shadow_remote_id);
            }
        }
        self.registry
            .mark_zombie(oid)
            .map_err(|_| HandlerError::DestroyUnknown(registry::to_wire(oid)))?;
        self.zombies.push_back((oid, self.messages_processed));
        Ok(())
    }

    fn link_special_case(
        &mut self,
        interface: &'static Interface,
        request_name: &str,
        _source_oid: ObjectId,
        new_id: u32,
        fd_remote_ids: &[i32],
    ) {
        if interface.name == "wl_shm" && request_name == "create_pool" {
            if let Some(&shadow_remote_id) = fd_remote_ids.first() {
                if let Some(obj) = self.registry.get_mut(registry::from_wire(new_id)) {
                    obj.payload = ObjectPayload::ShmPool { shadow_remote_id };
                }
            }
        }
    }

    fn tick(&mut self) {
        self.messages_processed += 1;
        while let Some(&(oid, marked_at)) = self.zombies.front() {
            if self.messages_processed.wrapping_sub(marked_at) >= ZOMBIE_IDLE_MESSAGES {
                self.zombies.pop_front();
                let _ = self.registry.remove(oid);
            } else {
                break;
            }
        }
    }
}

fn split_frame(frame: &[u8]) -> Result<(shadowpipe_protocol::FrameHeader, &[u8]), FrameError> {
    let header = read_header(frame).ok_or(FrameError::BadHeader)?;
    if !header_length_valid(header.length) {
        return Err(FrameError::SizeCheck(shadowpipe_protocol::ParseError::BadLength(
            header.length,
        )));
    }
    let end = header.length as usize;
    if frame.len() < end {
        return Err(FrameError::SizeCheck(shadowpipe_protocol::ParseError::Truncated));
    }
    Ok((header, &frame[HEADER_LEN..end]))
}

fn find_new_id(args: &[Argument]) -> Option<u32> {
    args.iter().find_map(|a| match a {
        Argument::NewId(id) => Some(*id),
        _ => None,
    })
}

fn find_new_id_dynamic(args: &[Argument]) -> Option<(u32, String)> {
    args.iter().find_map(|a| match a {
        Argument::NewIdDynamic { interface, id, .. } => Some((*id, interface.clone())),
        _ => None,
    })
}
