//! Trust-boundary command surface.
//!
//! Calls arriving from the normal world carry four loosely typed parameter
//! slots. [`SessionKeyStore::invoke`] compares the slot shapes against the
//! command's expected layout before reading any of them, then unpacks the
//! values and calls the typed API in [`crate::store`].
//!
//! | Command | Slot 0 | Slot 1 | Slot 2 | Slot 3 |
//! |---|---|---|---|---|
//! | `SessionKeyCreateAndGet` | memref out: key | value in: km handle | value in: session id, receiver flag | none |
//! | `SessionKeyCreate` | value out: index | value in: km handle | value in: session id, receiver flag | none |
//! | `SessionKeyDelete` | value in: index | none | none | none |
//! | `SessionKeyEncrypt` | memref inout: data | memref out: tag | value in: index, key len | memref in: iv |
//! | `SessionKeyDecrypt` | memref inout: data | memref in: tag | value in: index, key len | memref in: iv |
//!
//! On failure every output memref reports a size of zero and the create
//! index reads back as -1.

use crate::crypto::{Aead, Hmac};
use crate::error::SessionKeyError;
use crate::keys::{KeyMaterialHandle, KeyMaterialLookup};
use crate::store::SessionKeyStore;

/// Index value reported by `SessionKeyCreate` when no key was created.
pub const INVALID_INDEX: i32 = -1;

/// Shape of one parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    None,
    ValueInput,
    ValueOutput,
    MemrefInput,
    MemrefOutput,
    MemrefInout,
}

/// A caller-owned buffer and the number of meaningful bytes in it.
///
/// On input `size` is the valid length (or the capacity for outputs); on
/// output it is the number of bytes written.
#[derive(Debug)]
pub struct Memref<'a> {
    pub buffer: &'a mut [u8],
    pub size: usize,
}

impl<'a> Memref<'a> {
    /// Wrap a whole buffer.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        let size = buffer.len();
        Self { buffer, size }
    }

    /// The valid prefix of the buffer.
    pub fn data_mut(&mut self) -> &mut [u8] {
        let len = self.size.min(self.buffer.len());
        &mut self.buffer[..len]
    }
}

/// One parameter slot.
#[derive(Debug)]
pub enum Param<'a> {
    None,
    ValueInput { a: u32, b: u32 },
    ValueOutput { a: u32, b: u32 },
    MemrefInput(Memref<'a>),
    MemrefOutput(Memref<'a>),
    MemrefInout(Memref<'a>),
}

impl Param<'_> {
    /// The shape of this slot.
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::None => ParamType::None,
            Self::ValueInput { .. } => ParamType::ValueInput,
            Self::ValueOutput { .. } => ParamType::ValueOutput,
            Self::MemrefInput(_) => ParamType::MemrefInput,
            Self::MemrefOutput(_) => ParamType::MemrefOutput,
            Self::MemrefInout(_) => ParamType::MemrefInout,
        }
    }
}

/// Session-key commands accepted across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SessionKeyCreateAndGet,
    SessionKeyCreate,
    SessionKeyDelete,
    SessionKeyEncrypt,
    SessionKeyDecrypt,
}

impl Command {
    /// Decode a command identifier.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0x60 => Some(Self::SessionKeyCreateAndGet),
            0x61 => Some(Self::SessionKeyCreate),
            0x62 => Some(Self::SessionKeyDelete),
            0x63 => Some(Self::SessionKeyEncrypt),
            0x64 => Some(Self::SessionKeyDecrypt),
            _ => None,
        }
    }

    /// The command identifier.
    pub fn id(self) -> u32 {
        match self {
            Self::SessionKeyCreateAndGet => 0x60,
            Self::SessionKeyCreate => 0x61,
            Self::SessionKeyDelete => 0x62,
            Self::SessionKeyEncrypt => 0x63,
            Self::SessionKeyDecrypt => 0x64,
        }
    }

    /// The slot shapes this command requires.
    pub fn expected_types(self) -> [ParamType; 4] {
        use ParamType::*;
        match self {
            Self::SessionKeyCreateAndGet => [MemrefOutput, ValueInput, ValueInput, None],
            Self::SessionKeyCreate => [ValueOutput, ValueInput, ValueInput, None],
            Self::SessionKeyDelete => [ValueInput, None, None, None],
            Self::SessionKeyEncrypt => [MemrefInout, MemrefOutput, ValueInput, MemrefInput],
            Self::SessionKeyDecrypt => [MemrefInout, MemrefInput, ValueInput, MemrefInput],
        }
    }
}

impl<K, C, const N: usize> SessionKeyStore<K, C, N>
where
    K: KeyMaterialLookup,
    C: Hmac + Aead,
{
    /// Run a boundary command against this store.
    ///
    /// # Errors
    /// - `BadParameters` if the slot shapes differ from
    ///   [`Command::expected_types`]; nothing is read or mutated then.
    /// - Whatever the underlying operation reports.
    pub fn invoke(
        &mut self,
        command: Command,
        params: &mut [Param<'_>; 4],
    ) -> Result<(), SessionKeyError> {
        let expected = command.expected_types();
        if !params.iter().map(Param::param_type).eq(expected.iter().copied()) {
            tracing::error!(?command, "bad parameter types");
            return Err(SessionKeyError::BadParameters);
        }

        match command {
            Command::SessionKeyCreateAndGet => self.invoke_create_and_get(params),
            Command::SessionKeyCreate => self.invoke_create(params),
            Command::SessionKeyDelete => self.invoke_delete(params),
            Command::SessionKeyEncrypt | Command::SessionKeyDecrypt => {
                self.invoke_transform(command, params)
            }
        }
    }

    fn invoke_create_and_get(&mut self, params: &mut [Param<'_>; 4]) -> Result<(), SessionKeyError> {
        let [Param::MemrefOutput(output), Param::ValueInput { a: km, .. }, Param::ValueInput { a: session_id, b: receiver }, Param::None] =
            params
        else {
            return Err(SessionKeyError::BadParameters);
        };

        let (km, session_id, receiver) = (*km as KeyMaterialHandle, *session_id, *receiver > 0);
        let result = self.create_and_get(output.data_mut(), km, session_id, receiver);
        output.size = *result.as_ref().unwrap_or(&0);
        result.map(|_| ())
    }

    fn invoke_create(&mut self, params: &mut [Param<'_>; 4]) -> Result<(), SessionKeyError> {
        let [Param::ValueOutput { a: index, .. }, Param::ValueInput { a: km, .. }, Param::ValueInput { a: session_id, b: receiver }, Param::None] =
            params
        else {
            return Err(SessionKeyError::BadParameters);
        };

        *index = INVALID_INDEX as u32;
        let handle = self.create(*km as KeyMaterialHandle, *session_id, *receiver > 0)?;
        *index = handle.index();
        Ok(())
    }

    fn invoke_delete(&mut self, params: &mut [Param<'_>; 4]) -> Result<(), SessionKeyError> {
        let [Param::ValueInput { a: index, .. }, Param::None, Param::None, Param::None] = params else {
            return Err(SessionKeyError::BadParameters);
        };

        let handle = self.resolve(*index as i32).ok_or_else(|| {
            tracing::error!(index = *index as i32, "requested handle is uninitialized or out-of-bounds");
            SessionKeyError::NotFound
        })?;
        self.delete(handle)
    }

    fn invoke_transform(
        &mut self,
        command: Command,
        params: &mut [Param<'_>; 4],
    ) -> Result<(), SessionKeyError> {
        let (data, tag, index, key_len, iv) = match params {
            [Param::MemrefInout(data), Param::MemrefOutput(tag), Param::ValueInput { a, b }, Param::MemrefInput(iv)]
                if command == Command::SessionKeyEncrypt =>
            {
                (data, tag, *a, *b, iv)
            }
            [Param::MemrefInout(data), Param::MemrefInput(tag), Param::ValueInput { a, b }, Param::MemrefInput(iv)]
                if command == Command::SessionKeyDecrypt =>
            {
                (data, tag, *a, *b, iv)
            }
            _ => return Err(SessionKeyError::BadParameters),
        };

        let Some(handle) = self.resolve(index as i32) else {
            data.size = 0;
            tag.size = 0;
            tracing::error!(index = index as i32, "session key handle is invalid");
            return Err(SessionKeyError::BadParameters);
        };

        let iv = iv.data_mut();
        let result = if command == Command::SessionKeyEncrypt {
            self.encrypt(handle, key_len as usize, iv, data.data_mut(), tag.data_mut())
        } else {
            self.decrypt(handle, key_len as usize, iv, data.data_mut(), tag.data_mut())
        };

        match result {
            Ok(done) => {
                data.size = done.data_len;
                tag.size = done.tag_len;
                Ok(())
            }
            Err(e) => {
                data.size = 0;
                tag.size = 0;
                Err(e)
            }
        }
    }
}
