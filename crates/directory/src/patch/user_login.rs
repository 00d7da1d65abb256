use serde_json::Value;

use crate::models::UserLogin;

use super::{FieldBinding, Patch, PatchOptions, Update, convert};

const BINDINGS: &[FieldBinding<UserLogin>] = &[
    FieldBinding { field: "UserId", apply: set_user_id },
    FieldBinding { field: "LoginProvider", apply: set_login_provider },
    FieldBinding { field: "ProviderKey", apply: set_provider_key },
    FieldBinding { field: "ProviderDisplayName", apply: set_provider_display_name },
    FieldBinding { field: "SysUser", apply: set_sys_user },
    FieldBinding { field: "SysStatus", apply: set_sys_status },
    FieldBinding { field: "SysStart", apply: set_sys_start },
    FieldBinding { field: "SysEnd", apply: set_sys_end },
];

fn set_user_id(l: &mut UserLogin, v: &Value, _: PatchOptions) -> Result<(), String> {
    l.user_id = convert::guid(v)?;
    Ok(())
}

fn set_login_provider(l: &mut UserLogin, v: &Value, _: PatchOptions) -> Result<(), String> {
    l.login_provider = convert::string(v)?;
    Ok(())
}

fn set_provider_key(l: &mut UserLogin, v: &Value, _: PatchOptions) -> Result<(), String> {
    l.provider_key = convert::string(v)?;
    Ok(())
}

fn set_provider_display_name(l: &mut UserLogin, v: &Value, _: PatchOptions) -> Result<(), String> {
    l.provider_display_name = convert::optional_string(v)?;
    Ok(())
}

fn set_sys_user(l: &mut UserLogin, v: &Value, _: PatchOptions) -> Result<(), String> {
    l.temporal.sys_user = convert::string(v)?;
    Ok(())
}

fn set_sys_status(l: &mut UserLogin, v: &Value, _: PatchOptions) -> Result<(), String> {
    l.temporal.sys_status = convert::status(v)?;
    Ok(())
}

fn set_sys_start(l: &mut UserLogin, v: &Value, _: PatchOptions) -> Result<(), String> {
    l.temporal.sys_start = convert::timestamp(v)?;
    Ok(())
}

fn set_sys_end(l: &mut UserLogin, v: &Value, _: PatchOptions) -> Result<(), String> {
    l.temporal.sys_end = convert::timestamp(v)?;
    Ok(())
}

impl Patch for UserLogin {
    const ENTITY: &'static str = "UserLogin";

    fn bindings() -> &'static [FieldBinding<Self>] {
        BINDINGS
    }
}

impl Update for UserLogin {
    fn update(&mut self, source: &Self) {
        self.clone_from(source);
    }
}
