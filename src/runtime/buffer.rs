//! Raw byte storage behind `ArrayBuffer` objects.
//!
//! A [`BufferState`] is shared by `Rc` between the `ArrayBuffer` object and
//! every view over it, so detaching through any handle is observed by all of
//! them on their next access.

use crate::error::{JsError, JsResult};
use crate::types::{JsObject, JsValue};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct BufferState {
    data: RefCell<Vec<u8>>,
    detached: Cell<bool>,
}

impl BufferState {
    pub fn new(data: Vec<u8>) -> Rc<Self> {
        Rc::new(Self {
            data: RefCell::new(data),
            detached: Cell::new(false),
        })
    }

    /// Zero-filled storage; a length the allocator refuses is a RangeError.
    pub fn zeroed(len: usize) -> JsResult<Rc<Self>> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| JsError::range_error("Array buffer allocation failed"))?;
        data.resize(len, 0);
        Ok(Self::new(data))
    }

    pub fn is_detached(&self) -> bool {
        self.detached.get()
    }

    /// Byte length, zero once detached.
    pub fn byte_length(&self) -> usize {
        if self.is_detached() {
            0
        } else {
            self.data.borrow().len()
        }
    }

    // §25.1.3.5 DetachArrayBuffer; returns false when already detached.
    pub fn detach(&self) -> bool {
        if self.detached.replace(true) {
            return false;
        }
        let released = std::mem::take(&mut *self.data.borrow_mut());
        log::debug!("detached array buffer, released {} bytes", released.len());
        true
    }

    /// Snapshot of the contents; empty once detached.
    pub fn bytes(&self) -> Vec<u8> {
        if self.is_detached() {
            return Vec::new();
        }
        self.data.borrow().clone()
    }

    /// Copies `dest.len()` bytes starting at `offset`. Fails when detached or
    /// out of bounds.
    pub fn read(&self, offset: usize, dest: &mut [u8]) -> bool {
        if self.is_detached() {
            return false;
        }
        let data = self.data.borrow();
        match offset.checked_add(dest.len()) {
            Some(end) if end <= data.len() => {
                dest.copy_from_slice(&data[offset..end]);
                true
            }
            _ => false,
        }
    }

    pub fn write(&self, offset: usize, src: &[u8]) -> bool {
        if self.is_detached() {
            return false;
        }
        let mut data = self.data.borrow_mut();
        match offset.checked_add(src.len()) {
            Some(end) if end <= data.len() => {
                data[offset..end].copy_from_slice(src);
                true
            }
            _ => false,
        }
    }

    /// Copy of `[start, end)`, clamped to the current length.
    pub fn slice(&self, start: usize, end: usize) -> Vec<u8> {
        if self.is_detached() {
            return Vec::new();
        }
        let data = self.data.borrow();
        let end = end.min(data.len());
        let start = start.min(end);
        data[start..end].to_vec()
    }
}

/// Host-side handle to an `ArrayBuffer` object.
#[derive(Clone, Debug)]
pub struct ArrayBuffer {
    object: JsObject,
    state: Rc<BufferState>,
}

impl ArrayBuffer {
    pub(crate) fn from_state(object: JsObject, state: Rc<BufferState>) -> Self {
        Self { object, state }
    }

    pub fn from_object(object: &JsObject) -> Option<Self> {
        let state = object.borrow().array_buffer.clone()?;
        Some(Self {
            object: object.clone(),
            state,
        })
    }

    pub fn from_value(value: &JsValue) -> JsResult<Self> {
        value
            .as_object()
            .and_then(Self::from_object)
            .ok_or_else(|| JsError::type_error("not an ArrayBuffer"))
    }

    pub fn object(&self) -> &JsObject {
        &self.object
    }

    pub fn state(&self) -> &Rc<BufferState> {
        &self.state
    }

    pub fn detach(&self) -> bool {
        self.state.detach()
    }

    pub fn is_detached(&self) -> bool {
        self.state.is_detached()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.state.bytes()
    }

    pub fn byte_length(&self) -> usize {
        self.state.byte_length()
    }
}
