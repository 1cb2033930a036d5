use std::ffi::c_void;
use std::fmt::Display;

use libgssapi_sys::{gss_OID_desc_struct, gss_OID_set_desc, gss_indicate_mechs, gss_release_oid_set};

use crate::mechanism::Mechanism;

use super::Error;

/// SPNEGO, 1.3.6.1.5.5.2.
const SPNEGO: &[u8] = b"\x2b\x06\x01\x05\x05\x02";
/// Kerberos 5, 1.2.840.113554.1.2.2.
const KERBEROS5: &[u8] = b"\x2a\x86\x48\x86\xf7\x12\x01\x02\x02";

/// The concrete GSSAPI mechanism negotiation will run under. SPNEGO when the
/// library advertises it, raw Kerberos 5 otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MechanismOid {
    Spnego,
    Kerberos5,
}

impl MechanismOid {
    fn bytes(self) -> &'static [u8] {
        match self {
            MechanismOid::Spnego => SPNEGO,
            MechanismOid::Kerberos5 => KERBEROS5,
        }
    }

    /// The descriptor points into static OID bytes; the library treats it as
    /// read-only despite the pointer type.
    pub(crate) fn desc(self) -> gss_OID_desc_struct {
        let bytes = self.bytes();
        gss_OID_desc_struct {
            length: bytes.len() as u32,
            elements: bytes.as_ptr() as *mut c_void,
        }
    }
}

impl Display for MechanismOid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MechanismOid::Spnego => f.write_str("negotiate"),
            MechanismOid::Kerberos5 => f.write_str("kerberos5"),
        }
    }
}

/// Picks the OID to negotiate under by asking the library which mechanisms
/// it provides. NTLM never exists in a GSSAPI implementation.
pub(crate) fn resolve(mechanism: Mechanism) -> Result<MechanismOid, Error> {
    if mechanism != Mechanism::Negotiate {
        return Err(Error::Unsupported(mechanism));
    }
    let mechs = MechanismList::indicate()?;
    if mechs.contains(MechanismOid::Spnego) {
        Ok(MechanismOid::Spnego)
    } else if mechs.contains(MechanismOid::Kerberos5) {
        Ok(MechanismOid::Kerberos5)
    } else {
        Err(Error::NoMechanism)
    }
}

struct MechanismList(*mut gss_OID_set_desc);

impl MechanismList {
    fn indicate() -> Result<Self, Error> {
        let mut minor = 0;
        let mut set = std::ptr::null_mut::<gss_OID_set_desc>();
        let major = unsafe { gss_indicate_mechs(&mut minor, &mut set) };
        if major != 0 || set.is_null() {
            return Err(Error::Mechs { major, minor });
        }
        Ok(MechanismList(set))
    }

    fn contains(&self, oid: MechanismOid) -> bool {
        let set = unsafe { *self.0 };
        let elements = unsafe { std::slice::from_raw_parts(set.elements, set.count as usize) };
        elements.iter().any(|element| {
            let bytes =
                unsafe { std::slice::from_raw_parts(element.elements as *const u8, element.length as usize) };
            bytes == oid.bytes()
        })
    }
}

impl Drop for MechanismList {
    fn drop(&mut self) {
        let mut _s = 0;
        unsafe { gss_release_oid_set(&mut _s, &mut self.0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_matches_der_encoding() {
        assert_eq!(MechanismOid::Spnego.desc().length, 6);
        assert_eq!(MechanismOid::Kerberos5.desc().length, 9);
    }

    #[test]
    fn ntlm_is_never_resolvable() {
        assert!(matches!(
            resolve(Mechanism::Ntlm),
            Err(Error::Unsupported(Mechanism::Ntlm))
        ));
    }
}
