//! Buffer allocation
//!
//! The light core only needs "allocate / write / release a buffer of N
//! elements of size S". [`BufferAllocator`] is that seam.
//!
//! - [`HeadlessAllocator`]: CPU-side arena, used in tests and tools.
//! - [`WgpuBufferAllocator`]: real device buffers.

use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

fn generate_buffer_id() -> u64 {
    NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Opaque identity of an allocated buffer. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

impl BufferHandle {
    #[inline]
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: &'static str,
    /// Number of elements.
    pub count: usize,
    /// Element size in bytes.
    pub stride: usize,
    pub usage: wgpu::BufferUsages,
}

impl BufferDesc {
    #[must_use]
    pub fn storage(label: &'static str, count: usize, stride: usize) -> Self {
        Self {
            label,
            count,
            stride,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        }
    }

    #[inline]
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        (self.count * self.stride) as u64
    }
}

pub trait BufferAllocator {
    fn create_buffer(&mut self, desc: &BufferDesc) -> BufferHandle;

    /// Releases a buffer. Commands already submitted that reference it must
    /// still see valid memory; the allocator defers the actual free.
    fn release_buffer(&mut self, handle: BufferHandle);

    fn write_buffer(&mut self, handle: BufferHandle, data: &[u8]);
}

// ============================================================================
// Headless
// ============================================================================

#[derive(Debug)]
pub struct HeadlessBuffer {
    pub desc: BufferDesc,
    pub data: Vec<u8>,
}

/// Buffers live in host memory. Release is immediate since there is no
/// device to wait for.
#[derive(Debug, Default)]
pub struct HeadlessAllocator {
    buffers: FxHashMap<u64, HeadlessBuffer>,
    created: usize,
    released: usize,
}

impl HeadlessAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, handle: BufferHandle) -> Option<&HeadlessBuffer> {
        self.buffers.get(&handle.0)
    }

    #[must_use]
    pub fn is_live(&self, handle: BufferHandle) -> bool {
        self.buffers.contains_key(&handle.0)
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.buffers.len()
    }

    /// Total allocations made over the allocator's lifetime.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created
    }

    #[must_use]
    pub fn released_count(&self) -> usize {
        self.released
    }
}

impl BufferAllocator for HeadlessAllocator {
    fn create_buffer(&mut self, desc: &BufferDesc) -> BufferHandle {
        let id = generate_buffer_id();
        self.buffers.insert(
            id,
            HeadlessBuffer {
                desc: *desc,
                data: vec![0u8; desc.size_in_bytes() as usize],
            },
        );
        self.created += 1;
        BufferHandle(id)
    }

    fn release_buffer(&mut self, handle: BufferHandle) {
        if self.buffers.remove(&handle.0).is_some() {
            self.released += 1;
        } else {
            log::warn!("Releasing unknown buffer {handle:?}");
        }
    }

    fn write_buffer(&mut self, handle: BufferHandle, data: &[u8]) {
        let Some(buffer) = self.buffers.get_mut(&handle.0) else {
            log::error!("Write to unknown buffer {handle:?}");
            return;
        };
        if data.len() > buffer.data.len() {
            log::error!(
                "Write of {} bytes overflows buffer {:?} ({} bytes)",
                data.len(),
                buffer.desc.label,
                buffer.data.len()
            );
            return;
        }
        buffer.data[..data.len()].copy_from_slice(data);
    }
}

// ============================================================================
// wgpu
// ============================================================================

/// Device-backed allocator.
///
/// Dropping a `wgpu::Buffer` only drops our reference; wgpu keeps the memory
/// alive until every submitted command using it has finished.
pub struct WgpuBufferAllocator {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: FxHashMap<u64, wgpu::Buffer>,
}

impl WgpuBufferAllocator {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(&handle.0)
    }
}

impl BufferAllocator for WgpuBufferAllocator {
    fn create_buffer(&mut self, desc: &BufferDesc) -> BufferHandle {
        // Zero-sized bindings are invalid; keep one element.
        let size = desc.size_in_bytes().max(desc.stride.max(4) as u64);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size,
            usage: desc.usage,
            mapped_at_creation: false,
        });
        let id = generate_buffer_id();
        self.buffers.insert(id, buffer);
        BufferHandle(id)
    }

    fn release_buffer(&mut self, handle: BufferHandle) {
        self.buffers.remove(&handle.0);
    }

    fn write_buffer(&mut self, handle: BufferHandle, data: &[u8]) {
        if let Some(buffer) = self.buffers.get(&handle.0) {
            self.queue.write_buffer(buffer, 0, data);
        } else {
            log::error!("Write to unknown buffer {handle:?}");
        }
    }
}
