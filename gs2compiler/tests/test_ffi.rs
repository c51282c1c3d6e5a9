use gs2compiler::ffi::{compile_code, compile_code_no_header, delete_context, get_context};
use std::{
    ffi::{CStr, CString},
    ptr, slice,
};

fn c(text: &str) -> CString {
    CString::new(text).unwrap()
}

#[test]
fn test_compile_with_header() {
    let code = c("//#CLIENTSIDE\nfunction onCreated() {\n}");
    let script_type = c("weapon");
    let script_name = c("TestCode");

    unsafe {
        let ctx = get_context();
        let response = compile_code(ctx, code.as_ptr(), script_type.as_ptr(), script_name.as_ptr());

        assert!(response.success);
        assert!(response.err_msg.is_null());
        assert!(response.bytecode_size > 0);

        let bytecode = slice::from_raw_parts(response.bytecode, response.bytecode_size as usize);
        assert_eq!(&bytecode[2..20], b"weapon,TestCode,1,");
        assert_eq!(bytecode.last(), Some(&b'\n'));

        delete_context(ctx);
    }
}

#[test]
fn test_failure_message() {
    let code = c("//#CLIENTSIDE\nfunction onCreated()\n}");
    let script_type = c("weapon");
    let script_name = c("TestCode");

    unsafe {
        let ctx = get_context();
        let response = compile_code(ctx, code.as_ptr(), script_type.as_ptr(), script_name.as_ptr());

        assert!(!response.success);
        assert!(response.bytecode.is_null());
        assert_eq!(response.bytecode_size, 0);
        assert_eq!(
            CStr::from_ptr(response.err_msg).to_str(),
            Ok("malformed input at line 3: }\n")
        );

        delete_context(ctx);
    }
}

#[test]
fn test_null_source() {
    unsafe {
        let ctx = get_context();
        let response = compile_code_no_header(ctx, ptr::null());

        assert!(!response.success);
        assert_eq!(
            CStr::from_ptr(response.err_msg).to_str(),
            Ok("malformed input at line 0: \n")
        );

        delete_context(ctx);
    }
}

#[test]
fn test_null_script_type() {
    let code = c("x = 1;");
    let script_name = c("TestCode");

    unsafe {
        let ctx = get_context();
        let response = compile_code(ctx, code.as_ptr(), ptr::null(), script_name.as_ptr());

        assert!(!response.success);
        assert!(!response.err_msg.is_null());

        delete_context(ctx);
    }
}

#[test]
fn test_second_compile_returns_first_result() {
    let first = c("x = 1;");
    let second = c("y = ;");

    unsafe {
        let ctx = get_context();
        let a = compile_code_no_header(ctx, first.as_ptr());
        let b = compile_code_no_header(ctx, second.as_ptr());

        assert!(a.success && b.success);
        assert_eq!(a.bytecode, b.bytecode);
        assert_eq!(a.bytecode_size, b.bytecode_size);

        delete_context(ctx);
    }
}
