//! Flows driven through the HTTP backend against the fake hosted API.

mod session;
mod signup;

use agrinova_client::{FarmerSignup, ManagerSignup};

pub(crate) fn grace() -> ManagerSignup {
    ManagerSignup {
        email: "grace@sunrise.farm".into(),
        password: "layers-123".into(),
        full_name: "Grace Eze".into(),
        org_name: "Sunrise Farm".into(),
        phone: "08031234567".into(),
        org_address: "Km 4 Abakaliki Road, Enugu".into(),
    }
}

pub(crate) fn ada(join_code: &str) -> FarmerSignup {
    FarmerSignup {
        email: "ada@sunrise.farm".into(),
        password: "feeding-456".into(),
        full_name: "Ada Obi".into(),
        phone: "08098765432".into(),
        join_code: join_code.into(),
    }
}
