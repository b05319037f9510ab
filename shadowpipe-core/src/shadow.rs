//! Shadow-fd map and content synchronization.
//!
//! A shadow fd is the proxy's surrogate for a descriptor that crossed the
//! channel. Local identity (inode) dedupes repeated translation of the same
//! fd; a `remote_id` whose sign records which side minted it (matching the
//! source's convention: positive when created server-side, negative when
//! created client-side) is the name the peer uses for the same shadow.

use std::{
    collections::HashMap,
    ops::Range,
    os::fd::{AsFd, AsRawFd, OwnedFd, RawFd},
};

use nix::sys::stat::{fstat, SFlag};

use crate::{
    channel::{UpdateHeader, UpdateType},
    config::Side,
    error::FdError,
};

/// How a shadow fd's content should be synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    File,
    PipeReadable,
    PipeWritable,
    PipeBidirectional,
    GraphicsBuffer,
    Unknown,
}

impl Category {
    pub fn is_pipe(self) -> bool {
        matches!(
            self,
            Category::PipeReadable | Category::PipeWritable | Category::PipeBidirectional
        )
    }
}

/// Per-plane graphics-buffer layout, matching the wire's bit-exact
/// descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    pub assignment: u8,
    pub stride: u32,
    pub offset: u32,
}

/// Graphics-buffer format metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsFormat {
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub planes: Vec<PlaneLayout>,
    pub modifier: u64,
}

impl GraphicsFormat {
    /// Serialize the bit-exact 64-byte descriptor header.
    pub fn encode(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[0..4].copy_from_slice(&self.width.to_ne_bytes());
        out[4..8].copy_from_slice(&self.height.to_ne_bytes());
        out[8..12].copy_from_slice(&self.format.to_ne_bytes());
        out[12..16].copy_from_slice(&(self.planes.len() as u32).to_ne_bytes());
        for (i, plane) in self.planes.iter().take(4).enumerate() {
            out[16 + i] = plane.assignment;
        }
        for (i, plane) in self.planes.iter().take(4).enumerate() {
            let off = 20 + i * 4;
            out[off..off + 4].copy_from_slice(&plane.stride.to_ne_bytes());
        }
        for (i, plane) in self.planes.iter().take(4).enumerate() {
            let off = 36 + i * 4;
            out[off..off + 4].copy_from_slice(&plane.offset.to_ne_bytes());
        }
        out[56..64].copy_from_slice(&self.modifier.to_ne_bytes());
        out
    }

    pub fn decode(bytes: &[u8; 64]) -> Self {
        let width = u32::from_ne_bytes(bytes[0..4].try_into().unwrap());
        let height = u32::from_ne_bytes(bytes[4..8].try_into().unwrap());
        let format = u32::from_ne_bytes(bytes[8..12].try_into().unwrap());
        let plane_count = u32::from_ne_bytes(bytes[12..16].try_into().unwrap()) as usize;
        let mut planes = Vec::with_capacity(plane_count.min(4));
        for i in 0..plane_count.min(4) {
            let assignment = bytes[16 + i];
            let stride = u32::from_ne_bytes(bytes[20 + i * 4..24 + i * 4].try_into().unwrap());
            let offset = u32::from_ne_bytes(bytes[36 + i * 4..40 + i * 4].try_into().unwrap());
            planes.push(PlaneLayout {
                assignment,
                stride,
                offset,
            });
        }
        let modifier = u64::from_ne_bytes(bytes[56..64].try_into().unwrap());
        Self {
            width,
            height,
            format,
            planes,
            modifier,
        }
    }
}

/// The proxy's surrogate for a descriptor that crossed the channel.
pub struct ShadowFd {
    pub category: Category,
    pub remote_id: i32,
    pub local: Option<OwnedFd>,
    pub protocol_refs: u32,
    pub transfer_refs: u32,
    /// Exact mirror of the descriptor's content as last synchronized.
    pub mirror: Vec<u8>,
    /// `[min, max)` byte range changed since the last synchronization.
    pub dirty: (usize, usize),
    pub graphics: Option<GraphicsFormat>,
    /// Set when a worker task on this shadow failed; the shadow survives but
    /// its content is no longer trustworthy.
    pub poisoned: bool,
}

impl ShadowFd {
    fn mark_dirty(&mut self, range: Range<usize>) {
        if self.dirty.0 == self.dirty.1 {
            self.dirty = (range.start, range.end);
        } else {
            self.dirty.0 = self.dirty.0.min(range.start);
            self.dirty.1 = self.dirty.1.max(range.end);
        }
    }

    fn clear_dirty(&mut self) {
        self.dirty = (0, 0);
    }
}

impl std::fmt::Debug for ShadowFd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowFd")
            .field("category", &self.category)
            .field("remote_id", &self.remote_id)
            .field("protocol_refs", &self.protocol_refs)
            .field("transfer_refs", &self.transfer_refs)
            .field("mirror_len", &self.mirror.len())
            .field("dirty", &self.dirty)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

/// Optional metadata supplied by the caller when translating a local fd, used
/// when stat alone cannot determine the category (graphics buffers).
#[derive(Debug, Clone)]
pub struct TranslateHint {
    pub graphics: Option<GraphicsFormat>,
}

fn classify(fd: RawFd, hint: &TranslateHint) -> Result<(Category, u64, u64, usize), FdError> {
    if hint.graphics.is_some() {
        // Driver-reported size stands in for a real mapped buffer size; the
        // hardware backend is out of scope, so we size from the plane layout
        // instead of mapping through a driver.
        return Ok((Category::GraphicsBuffer, 0, fd as u64, 0));
    }
    let st = fstat(fd).map_err(|e| FdError::Stat(std::io::Error::from(e)))?;
    let mode = SFlag::from_bits_truncate(st.st_mode);
    if mode.contains(SFlag::S_IFREG) {
        Ok((Category::File, st.st_dev, st.st_ino, st.st_size as usize))
    } else if mode.contains(SFlag::S_IFIFO) {
        let access = nix::fcntl::fcntl(fd, nix::fcntl::FcntlArg::F_GETFL)
            .map_err(|e| FdError::Stat(std::io::Error::from(e)))?;
        let flags = nix::fcntl::OFlag::from_bits_truncate(access);
        let category = if flags.contains(nix::fcntl::OFlag::O_RDWR) {
            Category::PipeBidirectional
        } else if flags.contains(nix::fcntl::OFlag::O_WRONLY) {
            Category::PipeWritable
        } else {
            Category::PipeReadable
        };
        Ok((category, st.st_dev, st.st_ino, 0))
    } else {
        Ok((Category::Unknown, st.st_dev, st.st_ino, 0))
    }
}

/// Per-connection shadow-fd map. Owned by a single pipeline direction; not
/// shared.
pub struct ShadowMap {
    shadows: HashMap<i32, ShadowFd>,
    by_inode: HashMap<(u64, u64), i32>,
    local_sign: i32,
    next_id: u32,
}

impl ShadowMap {
    pub fn new(side: Side) -> Self {
        // Remote ids are positive when minted server-side (the
        // display-facing proxy), negative when minted client-side.
        let local_sign = match side {
            Side::Display => 1,
            Side::Client => -1,
        };
        Self {
            shadows: HashMap::new(),
            by_inode: HashMap::new(),
            local_sign,
            next_id: 0,
        }
    }

    fn allocate_remote_id(&mut self) -> i32 {
        loop {
            self.next_id += 1;
            let candidate = self.next_id as i32 * self.local_sign;
            if candidate != 0 && !self.shadows.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Translate a local fd into its shadow, creating one on first sight.
    /// Idempotent: translating the same fd (by inode identity) twice returns
    /// the same shadow and does not duplicate state, but each call still
    /// increments `protocol_refs`.
    pub fn translate(&mut self, fd: OwnedFd, hint: TranslateHint) -> Result<i32, FdError> {
        let (category, dev, ino, size) = classify(fd.as_raw_fd(), &hint)?;
        let key = (dev, ino);
        if let Some(&remote_id) = self.by_inode.get(&key) {
            let shadow = self.shadows.get_mut(&remote_id).expect("inode index stale");
            shadow.protocol_refs += 1;
            return Ok(remote_id);
        }

        let mirror = match category {
            Category::File => read_all(fd.as_raw_fd(), size)?,
            Category::GraphicsBuffer => vec![0u8; 0],
            _ => Vec::new(),
        };

        let remote_id = self.allocate_remote_id();
        let shadow = ShadowFd {
            category,
            remote_id,
            local: Some(fd),
            protocol_refs: 1,
            transfer_refs: 0,
            mirror,
            dirty: (0, 0),
            graphics: hint.graphics,
            poisoned: false,
        };
        self.shadows.insert(remote_id, shadow);
        if category == Category::File || category.is_pipe() {
            self.by_inode.insert(key, remote_id);
        }
        Ok(remote_id)
    }

    pub fn get(&self, remote_id: i32) -> Option<&ShadowFd> {
        self.shadows.get(&remote_id)
    }

    pub fn get_mut(&mut self, remote_id: i32) -> Option<&mut ShadowFd> {
        self.shadows.get_mut(&remote_id)
    }

    /// Mark a byte range dirty on an owned shadow, e.g. after the protocol
    /// layer observes a write into the fd it is proxying.
    pub fn mark_dirty(&mut self, remote_id: i32, range: Range<usize>) {
        if let Some(shadow) = self.shadows.get_mut(&remote_id) {
            shadow.mark_dirty(range);
        }
    }

    /// Create a placeholder shadow for a remote id first referenced by an
    /// incoming protocol message, before its content update has arrived.
    pub fn placeholder(&mut self, remote_id: i32, category: Category, size: usize) -> &mut ShadowFd {
        self.shadows.entry(remote_id).or_insert_with(|| ShadowFd {
            category,
            remote_id,
            local: None,
            protocol_refs: 0,
            transfer_refs: 0,
            mirror: vec![0; size],
            dirty: (0, 0),
            graphics: None,
            poisoned: false,
        })
    }

    /// Drop the protocol-side reference; frees the shadow when both
    /// refcounts are zero.
    pub fn decref_protocol(&mut self, remote_id: i32) -> bool {
        self.decref(remote_id, true)
    }

    /// Drop the transfer-side reference; frees the shadow when both
    /// refcounts are zero.
    pub fn decref_transfer(&mut self, remote_id: i32) -> bool {
        self.decref(remote_id, false)
    }

    fn decref(&mut self, remote_id: i32, protocol: bool) -> bool {
        let Some(shadow) = self.shadows.get_mut(&remote_id) else {
            return false;
        };
        if protocol {
            shadow.protocol_refs = shadow.protocol_refs.saturating_sub(1);
        } else {
            shadow.transfer_refs = shadow.transfer_refs.saturating_sub(1);
        }
        if shadow.protocol_refs == 0 && shadow.transfer_refs == 0 {
            if let Some(shadow) = self.shadows.remove(&remote_id) {
                self.by_inode.retain(|_, v| *v != remote_id);
                drop(shadow); // closes `local` via OwnedFd's Drop
            }
            true
        } else {
            false
        }
    }

    /// Called after an outbound message carrying these remote ids has been
    /// fully serialized.
    pub fn decref_transferred_rids(&mut self, ids: &[i32]) {
        for &id in ids {
            self.decref_transfer(id);
        }
    }

    pub fn increment_transfer(&mut self, remote_id: i32) {
        if let Some(shadow) = self.shadows.get_mut(&remote_id) {
            shadow.transfer_refs += 1;
        }
    }

    /// Iterate shadows with something to synchronize. Iteration order is
    /// unspecified.
    pub fn dirty_shadows(&self) -> impl Iterator<Item = i32> + '_ {
        self.shadows
            .values()
            .filter(|s| s.dirty.0 != s.dirty.1 || s.category.is_pipe())
            .map(|s| s.remote_id)
    }

    /// Read every dirty shadow's current content, diff or drain it against
    /// what was last synchronized, and return the uncompressed `(header,
    /// payload)` pairs ready to be compressed and queued for transmission.
    /// Each shadow's mirror and dirty range are updated as part of
    /// collecting its update, so a shadow not touched again before the next
    /// call simply produces nothing next time.
    pub fn collect_updates(&mut self) -> Vec<(UpdateHeader, Vec<u8>)> {
        let dirty: Vec<i32> = self.dirty_shadows().collect();
        let mut updates = Vec::with_capacity(dirty.len());
        for remote_id in dirty {
            if let Some(update) = self.collect_one(remote_id) {
                updates.push(update);
            }
        }
        updates
    }

    fn collect_one(&mut self, remote_id: i32) -> Option<(UpdateHeader, Vec<u8>)> {
        let shadow = self.shadows.get_mut(&remote_id)?;
        if shadow.poisoned {
            return None;
        }
        match shadow.category {
            Category::File => {
                let fd = shadow.local.as_ref()?.as_raw_fd();
                let current = read_all(fd, shadow.mirror.len()).ok()?;
                let (start, end) = shadow.dirty;
                let diff = construct_diff(&shadow.mirror, &current, start..end);
                shadow.mirror = current;
                shadow.clear_dirty();
                if diff.is_empty() {
                    return None;
                }
                let payload = encode_diff(&diff);
                Some((
                    UpdateHeader {
                        update_type: UpdateType::FileDiff,
                        remote_id,
                        size: payload.len() as u32,
                    },
                    payload,
                ))
            }
            Category::PipeReadable | Category::PipeBidirectional => {
                let fd = shadow.local.as_ref()?.as_raw_fd();
                let mut buf = [0u8; 4096];
                shadow.clear_dirty();
                match nix::unistd::read(fd, &mut buf) {
                    Ok(0) => Some((
                        UpdateHeader {
                            update_type: UpdateType::PipeHangup,
                            remote_id,
                            size: 0,
                        },
                        Vec::new(),
                    )),
                    Ok(n) => Some((
                        UpdateHeader {
                            update_type: UpdateType::PipeWrite,
                            remote_id,
                            size: n as u32,
                        },
                        buf[..n].to_vec(),
                    )),
                    Err(_) => None,
                }
            }
            Category::PipeWritable | Category::GraphicsBuffer | Category::Unknown => {
                shadow.clear_dirty();
                None
            }
        }
    }

    /// Apply a decompressed update arriving from the peer to the named
    /// shadow's mirror, and mirror the same bytes into the local descriptor
    /// when one has already been reconstructed for it.
    pub fn apply_update(&mut self, header: UpdateHeader, raw: &[u8]) -> Result<(), FdError> {
        let Some(shadow) = self.shadows.get_mut(&header.remote_id) else {
            return Ok(());
        };
        match header.update_type {
            UpdateType::FileInit | UpdateType::FileExtend => {
                shadow.mirror = raw.to_vec();
            }
            UpdateType::FileDiff => {
                let diff = decode_diff(raw);
                apply_diff(&mut shadow.mirror, &diff);
            }
            UpdateType::PipeWrite => {
                if let Some(local) = &shadow.local {
                    nix::unistd::write(local.as_fd().as_raw_fd(), raw)
                        .map_err(|e| FdError::Reconstruct(std::io::Error::from(e)))?;
                }
                return Ok(());
            }
            UpdateType::PipeHangup | UpdateType::DmabufInit | UpdateType::DmabufDiff => {
                return Ok(());
            }
        }
        if let Some(local) = &shadow.local {
            nix::unistd::lseek(local.as_fd().as_raw_fd(), 0, nix::unistd::Whence::SeekSet)
                .map_err(|e| FdError::Reconstruct(std::io::Error::from(e)))?;
            nix::unistd::write(local.as_fd().as_raw_fd(), &shadow.mirror)
                .map_err(|e| FdError::Reconstruct(std::io::Error::from(e)))?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.shadows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shadows.is_empty()
    }
}

fn read_all(fd: RawFd, size: usize) -> Result<Vec<u8>, FdError> {
    use std::os::fd::BorrowedFd;
    if size == 0 {
        return Ok(Vec::new());
    }
    // Mirror the content through a read-only mmap rather than a seek+read
    // loop; the mirror itself only needs the bytes, not a live mapping.
    // SAFETY: `fd` outlives this call; it is the raw fd of an `OwnedFd` held
    // by the caller for the duration of this function.
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    let file = std::fs::File::from(borrowed.try_clone_to_owned().expect("dup fd for read"));
    let map = unsafe { memmap2::MmapOptions::new().len(size).map(&file) }.map_err(FdError::Mmap)?;
    Ok(map.to_vec())
}

/// K consecutive equal words required to close a changed run. Fixed as part
/// of the channel contract: both sides must agree, and this is the value
/// this implementation commits to.
pub const RUN_CLOSE_THRESHOLD: usize = 4;

/// A single word-aligned changed run, as `(start_word, end_word)` plus the
/// new bytes covering that range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRun {
    pub start_word: u32,
    pub end_word: u32,
    pub bytes: Vec<u8>,
}

fn word_at(buf: &[u8], word: usize) -> u32 {
    let off = word * 4;
    u32::from_ne_bytes(buf[off..off + 4].try_into().unwrap())
}

/// Construct the diff between `base` and `current` over `range`: scan
/// word-aligned, emit a run on the first differing word, close it once
/// [`RUN_CLOSE_THRESHOLD`] consecutive equal words are found.
pub fn construct_diff(base: &[u8], current: &[u8], range: Range<usize>) -> Vec<DiffRun> {
    assert_eq!(base.len(), current.len(), "diff requires equal-size buffers");
    let word_start = range.start / 4;
    let word_end = range.end.div_ceil(4).min(base.len() / 4);
    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut equal_streak = 0usize;

    for w in word_start..word_end {
        if word_at(base, w) != word_at(current, w) {
            equal_streak = 0;
            run_start.get_or_insert(w);
        } else if let Some(start) = run_start {
            equal_streak += 1;
            if equal_streak >= RUN_CLOSE_THRESHOLD {
                let end = w - equal_streak + 1;
                runs.push(close_run(current, start, end));
                run_start = None;
                equal_streak = 0;
            }
        }
    }
    if let Some(start) = run_start {
        runs.push(close_run(current, start, word_end));
    }
    runs
}

fn close_run(current: &[u8], start_word: usize, end_word: usize) -> DiffRun {
    DiffRun {
        start_word: start_word as u32,
        end_word: end_word as u32,
        bytes: current[start_word * 4..end_word * 4].to_vec(),
    }
}

/// Apply a diff produced by [`construct_diff`] to `base` in place.
pub fn apply_diff(base: &mut [u8], diff: &[DiffRun]) {
    for run in diff {
        let start = run.start_word as usize * 4;
        let end = run.end_word as usize * 4;
        base[start..end].copy_from_slice(&run.bytes);
    }
}

/// Serialize a diff as `(start_word, end_word, bytes)` triples back to back,
/// the wire payload carried by a `FileDiff` update frame.
pub fn encode_diff(runs: &[DiffRun]) -> Vec<u8> {
    let mut out = Vec::new();
    for run in runs {
        out.extend_from_slice(&run.start_word.to_ne_bytes());
        out.extend_from_slice(&run.end_word.to_ne_bytes());
        out.extend_from_slice(&run.bytes);
    }
    out
}

/// Inverse of [`encode_diff`].
pub fn decode_diff(bytes: &[u8]) -> Vec<DiffRun> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + 8 <= bytes.len() {
        let start_word = u32::from_ne_bytes(bytes[i..i + 4].try_into().unwrap());
        let end_word = u32::from_ne_bytes(bytes[i + 4..i + 8].try_into().unwrap());
        let len = (end_word.saturating_sub(start_word)) as usize * 4;
        if i + 8 + len > bytes.len() {
            break;
        }
        out.push(DiffRun {
            start_word,
            end_word,
            bytes: bytes[i + 8..i + 8 + len].to_vec(),
        });
        i += 8 + len;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_encode_decode_round_trips() {
        let base = vec![0u8; 64];
        let mut current = base.clone();
        current[8..12].copy_from_slice(&0xdeadbeefu32.to_ne_bytes());
        let diff = construct_diff(&base, &current, 0..64);
        let encoded = encode_diff(&diff);
        let decoded = decode_diff(&encoded);
        assert_eq!(decoded, diff);
    }

    #[test]
    fn collect_updates_then_apply_update_round_trips_a_file_shadow() {
        use std::io::{Seek, SeekFrom, Write};

        let mut map = ShadowMap::new(Side::Client);
        let mut tmp = tempfile::tempfile().unwrap();
        let initial = vec![0u8; 64];
        tmp.write_all(&initial).unwrap();
        tmp.seek(SeekFrom::Start(0)).unwrap();
        let fd: OwnedFd = tmp.try_clone().unwrap().into();
        let remote_id = map.translate(fd, TranslateHint { graphics: None }).unwrap();

        let mut updated = initial.clone();
        updated[8..12].copy_from_slice(&0x12345678u32.to_ne_bytes());
        tmp.write_all(&updated).unwrap();
        tmp.seek(SeekFrom::Start(0)).unwrap();

        map.mark_dirty(remote_id, 0..64);
        let updates = map.collect_updates();
        assert_eq!(updates.len(), 1);
        let (header, payload) = &updates[0];
        assert_eq!(header.update_type, UpdateType::FileDiff);
        assert_eq!(header.remote_id, remote_id);

        // Apply the same update against a fresh receiving-side map tracking
        // the shadow under the same remote id, starting from the same base.
        let mut peer = ShadowMap::new(Side::Display);
        peer.shadows.insert(
            remote_id,
            ShadowFd {
                category: Category::File,
                remote_id,
                local: None,
                protocol_refs: 1,
                transfer_refs: 0,
                mirror: initial.clone(),
                dirty: (0, 0),
                graphics: None,
                poisoned: false,
            },
        );
        peer.apply_update(*header, payload).unwrap();
        assert_eq!(peer.get(remote_id).unwrap().mirror, updated);
    }

    #[test]
    fn diff_inverse_on_scattered_changes() {
        let base = vec![0u8; 4096];
        let mut current = base.clone();
        for w in 128..132 {
            current[w * 4..w * 4 + 4].copy_from_slice(&0x11u32.to_ne_bytes());
        }
        for w in 300..302 {
            current[w * 4..w * 4 + 4].copy_from_slice(&0x22u32.to_ne_bytes());
        }
        let diff = construct_diff(&base, &current, 0..4096);
        // Gap between word 132 and 300 exceeds the close threshold, so two
        // separate runs, covering exactly the 6 changed words.
        assert_eq!(diff.len(), 2);
        let changed_words: usize = diff.iter().map(|r| (r.end_word - r.start_word) as usize).sum();
        assert_eq!(changed_words, 6);
        let payload_bytes: usize = diff.iter().map(|r| r.bytes.len()).sum();
        assert_eq!(payload_bytes, 24);

        let mut reconstructed = base.clone();
        apply_diff(&mut reconstructed, &diff);
        assert_eq!(reconstructed, current);
    }

    #[test]
    fn diff_inverse_property_random_like() {
        let base: Vec<u8> = (0..256u32).flat_map(|i| i.to_ne_bytes()).collect();
        let mut current = base.clone();
        // Flip a handful of scattered words.
        for &w in &[0usize, 1, 5, 6, 7, 40, 63] {
            current[w * 4..w * 4 + 4].copy_from_slice(&0xdeadbeefu32.to_ne_bytes());
        }
        let diff = construct_diff(&base, &current, 0..base.len());
        let mut reconstructed = base.clone();
        apply_diff(&mut reconstructed, &diff);
        assert_eq!(reconstructed, current);

        // Outside any differing region, diff is empty and both buffers match.
        let empty_diff = construct_diff(&base, &base, 0..base.len());
        assert!(empty_diff.is_empty());
    }

    #[test]
    fn graphics_descriptor_round_trips() {
        let fmt = GraphicsFormat {
            width: 1920,
            height: 1080,
            format: 0x3432_3058, // "X024"-ish fourcc as a u32
            planes: vec![PlaneLayout {
                assignment: 0,
                stride: 7680,
                offset: 0,
            }],
            modifier: 0x00ff_ffff_ffff_ffff,
        };
        let encoded = fmt.encode();
        assert_eq!(encoded.len(), 64);
        let decoded = GraphicsFormat::decode(&encoded);
        assert_eq!(decoded, fmt);
    }
}
