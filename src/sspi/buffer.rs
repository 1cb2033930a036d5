use std::ffi::c_void;

use windows::Win32::Security::Authentication::Identity::{SecBuffer, SECBUFFER_TOKEN};

/// Fixed-capacity output token storage. The package writes into it through a
/// `SecBuffer` and reports how much it used; the buffer never reallocates
/// while the raw pointer is outstanding.
pub(crate) struct TokenBuffer {
    data: Box<[u8]>,
    length: u32,
}

impl TokenBuffer {
    pub(crate) fn with_capacity(capacity: u32) -> Self {
        TokenBuffer {
            data: vec![0u8; capacity as usize].into_boxed_slice(),
            length: 0,
        }
    }

    pub(crate) fn sec_buffer(&mut self) -> SecBuffer {
        SecBuffer {
            cbBuffer: self.data.len() as u32,
            BufferType: SECBUFFER_TOKEN,
            pvBuffer: self.data.as_mut_ptr() as *mut c_void,
        }
    }

    pub(crate) fn set_length(&mut self, length: u32) {
        self.length = length.min(self.data.len() as u32);
    }

    pub(crate) fn to_vec(&self) -> Vec<u8> {
        self.data[..self.length as usize].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_clamped_to_capacity() {
        let mut buffer = TokenBuffer::with_capacity(4);
        buffer.set_length(9);
        assert_eq!(buffer.to_vec().len(), 4);
    }
}
