use crevice::std140::{AsStd140, Std140};
use std::marker::PhantomData;

pub fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Offsets for a uniform buffer holding one header block followed by
/// equally sized element blocks, each starting on a bindable offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformAligner {
    alignment: usize,
    header_size: usize,
    element_size: usize,
}

impl UniformAligner {
    /// `alignment` is rounded up to a power of two.
    pub fn new(alignment: usize, header_size: usize, element_size: usize) -> Self {
        UniformAligner {
            alignment: alignment.max(1).next_power_of_two(),
            header_size,
            element_size,
        }
    }

    pub fn for_blocks<H: AsStd140, E: AsStd140>(alignment: usize) -> Self {
        Self::new(
            alignment,
            H::std140_size_static(),
            E::std140_size_static(),
        )
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn header_stride(&self) -> usize {
        align_up(self.header_size, self.alignment)
    }

    pub fn element_stride(&self) -> usize {
        align_up(self.element_size, self.alignment)
    }

    pub fn element_offset(&self, index: usize) -> usize {
        self.header_stride() + index * self.element_stride()
    }

    pub fn buffer_size(&self, element_count: usize) -> usize {
        self.element_offset(element_count)
    }
}

/// Writes std140 blocks into a byte buffer at the offsets of a [`UniformAligner`].
pub struct UniformBufferBuilder<H, E> {
    aligner: UniformAligner,
    data: Vec<u8>,
    element_count: usize,
    _blocks: PhantomData<(H, E)>,
}

impl<H: AsStd140, E: AsStd140> UniformBufferBuilder<H, E> {
    pub fn new(alignment: usize, header: &H) -> Self {
        let aligner = UniformAligner::for_blocks::<H, E>(alignment);
        let mut builder = UniformBufferBuilder {
            aligner,
            data: vec![0; aligner.header_stride()],
            element_count: 0,
            _blocks: PhantomData,
        };
        builder.write(0, header.as_std140().as_bytes());
        builder
    }

    pub fn push(&mut self, element: &E) -> usize {
        let index = self.element_count;
        let offset = self.aligner.element_offset(index);

        self.data.resize(offset + self.aligner.element_stride(), 0);
        self.write(offset, element.as_std140().as_bytes());
        self.element_count += 1;

        index
    }

    pub fn aligner(&self) -> &UniformAligner {
        &self.aligner
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}
