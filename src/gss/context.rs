use std::ptr::NonNull;

use libgssapi_sys::{gss_ctx_id_struct, gss_delete_sec_context};

pub struct ContextHandle(NonNull<gss_ctx_id_struct>);

// Sole owner of the context; mutation requires &mut.
unsafe impl Send for ContextHandle {}
unsafe impl Sync for ContextHandle {}

impl ContextHandle {
    pub(crate) fn new(ctx: NonNull<gss_ctx_id_struct>) -> Self {
        ContextHandle(ctx)
    }

    pub(crate) fn as_mut(&mut self) -> &mut gss_ctx_id_struct {
        unsafe { self.0.as_mut() }
    }
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        let mut _s = 0;
        unsafe { gss_delete_sec_context(&mut _s, &mut NonNull::as_ptr(self.0), std::ptr::null_mut()) };
    }
}
