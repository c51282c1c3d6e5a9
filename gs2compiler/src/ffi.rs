//! C interface.
//!
//! A context is handed to the caller as an opaque pointer. Pointers in a
//! [`Response`] borrow from the context and stay valid until the context
//! is deleted.
use crate::context::{CompileResult, Context};
use std::{
    ffi::{CStr, CString},
    os::raw::c_char,
    ptr,
};

#[repr(C)]
#[derive(Debug)]
pub struct Response {
    pub success: bool,
    /// Nul terminated message, null on success.
    pub err_msg: *const c_char,
    /// Bytecode image, null on failure.
    pub bytecode: *const u8,
    pub bytecode_size: u32,
}

impl Response {
    fn invalid() -> Self {
        Self {
            success: false,
            err_msg: ptr::null(),
            bytecode: ptr::null(),
            bytecode_size: 0,
        }
    }
}

#[no_mangle]
pub extern "C" fn get_context() -> *mut Context {
    Box::into_raw(Box::new(Context::new()))
}

/// Compile a script with the header for its type and name.
///
/// # Safety
///
/// `ctx` must come from [`get_context`] and not be deleted. The strings
/// must be null or nul terminated.
#[no_mangle]
pub unsafe extern "C" fn compile_code(
    ctx: *mut Context,
    code: *const c_char,
    script_type: *const c_char,
    script_name: *const c_char,
) -> Response {
    let ctx = match ctx.as_mut() {
        Some(ctx) => ctx,
        None => return Response::invalid(),
    };

    let code = read_str(code);
    // Empty type names are never known, which reports the missing argument.
    let script_type = read_str(script_type);
    let script_name = read_str(script_name);

    if ctx.compile(&code, &script_type, &script_name).is_err() {
        log::warn!("context compiled twice, returning the first result");
    }
    respond(ctx)
}

/// Compile a script without header.
///
/// # Safety
///
/// See [`compile_code`].
#[no_mangle]
pub unsafe extern "C" fn compile_code_no_header(ctx: *mut Context, code: *const c_char) -> Response {
    let ctx = match ctx.as_mut() {
        Some(ctx) => ctx,
        None => return Response::invalid(),
    };

    let code = read_str(code);
    if ctx.compile_raw(&code).is_err() {
        log::warn!("context compiled twice, returning the first result");
    }
    respond(ctx)
}

/// Free a context and everything it owns.
///
/// # Safety
///
/// `ctx` must be null or come from [`get_context`], and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn delete_context(ctx: *mut Context) {
    if !ctx.is_null() {
        Box::from_raw(ctx).destroy();
    }
}

/// Null is read as the empty string, invalid UTF-8 is replaced.
unsafe fn read_str<'a>(text: *const c_char) -> std::borrow::Cow<'a, str> {
    if text.is_null() {
        "".into()
    } else {
        CStr::from_ptr(text).to_string_lossy()
    }
}

fn respond(ctx: &mut Context) -> Response {
    let (success, message, bytecode) = match ctx.result() {
        Some(CompileResult::Success { bytecode, .. }) => (true, None, bytecode.as_slice()),
        Some(CompileResult::Failure(diag)) => (false, Some(diag.message()), &[][..]),
        None => return Response::invalid(),
    };

    let bytecode_size = match u32::try_from(bytecode.len()) {
        Ok(size) => size,
        Err(_) => return Response::invalid(),
    };
    let bytecode = if success { bytecode.as_ptr() } else { ptr::null() };

    // Messages never contain nul bytes, the line text is cut at one if needed.
    let message = message.map(|text| {
        let text = text.split('\0').next().unwrap_or_default();
        CString::new(text).unwrap_or_default()
    });

    let c_message = match message {
        Some(message) => ctx.c_message.insert(message).as_ptr(),
        None => ptr::null(),
    };

    Response {
        success,
        err_msg: c_message,
        bytecode,
        bytecode_size,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_null_context() {
        let response = unsafe { compile_code_no_header(ptr::null_mut(), ptr::null()) };
        assert!(!response.success);
        assert!(response.err_msg.is_null());
        assert!(response.bytecode.is_null());
        unsafe { delete_context(ptr::null_mut()) };
    }

    #[test]
    fn test_failure_message() {
        let ctx = get_context();
        let code = CString::new("x = ;").unwrap();
        let response = unsafe { compile_code_no_header(ctx, code.as_ptr()) };

        assert!(!response.success);
        assert_eq!(response.bytecode_size, 0);
        let message = unsafe { CStr::from_ptr(response.err_msg) };
        assert_eq!(message.to_str(), Ok("malformed input at line 1: x = ;\n"));

        unsafe { delete_context(ctx) };
    }
}
