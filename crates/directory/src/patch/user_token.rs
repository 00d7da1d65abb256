use serde_json::Value;

use crate::models::UserToken;

use super::{FieldBinding, Patch, PatchOptions, Update, convert};

const BINDINGS: &[FieldBinding<UserToken>] = &[
    FieldBinding { field: "UserId", apply: set_user_id },
    FieldBinding { field: "LoginProvider", apply: set_login_provider },
    FieldBinding { field: "Name", apply: set_name },
    FieldBinding { field: "Value", apply: set_value },
    FieldBinding { field: "Properties", apply: set_properties },
    FieldBinding { field: "SysUser", apply: set_sys_user },
    FieldBinding { field: "SysStatus", apply: set_sys_status },
    FieldBinding { field: "SysStart", apply: set_sys_start },
    FieldBinding { field: "SysEnd", apply: set_sys_end },
];

fn set_user_id(t: &mut UserToken, v: &Value, _: PatchOptions) -> Result<(), String> {
    t.user_id = convert::guid(v)?;
    Ok(())
}

fn set_login_provider(t: &mut UserToken, v: &Value, _: PatchOptions) -> Result<(), String> {
    t.login_provider = convert::string(v)?;
    Ok(())
}

fn set_name(t: &mut UserToken, v: &Value, _: PatchOptions) -> Result<(), String> {
    t.name = convert::string(v)?;
    Ok(())
}

fn set_value(t: &mut UserToken, v: &Value, _: PatchOptions) -> Result<(), String> {
    t.value = convert::optional_string(v)?;
    Ok(())
}

fn set_properties(t: &mut UserToken, v: &Value, options: PatchOptions) -> Result<(), String> {
    let incoming = convert::string_map(v)?;
    convert::merge_map(&mut t.properties, incoming, options.merge_collections);
    Ok(())
}

fn set_sys_user(t: &mut UserToken, v: &Value, _: PatchOptions) -> Result<(), String> {
    t.temporal.sys_user = convert::string(v)?;
    Ok(())
}

fn set_sys_status(t: &mut UserToken, v: &Value, _: PatchOptions) -> Result<(), String> {
    t.temporal.sys_status = convert::status(v)?;
    Ok(())
}

fn set_sys_start(t: &mut UserToken, v: &Value, _: PatchOptions) -> Result<(), String> {
    t.temporal.sys_start = convert::timestamp(v)?;
    Ok(())
}

fn set_sys_end(t: &mut UserToken, v: &Value, _: PatchOptions) -> Result<(), String> {
    t.temporal.sys_end = convert::timestamp(v)?;
    Ok(())
}

impl Patch for UserToken {
    const ENTITY: &'static str = "UserToken";

    fn bindings() -> &'static [FieldBinding<Self>] {
        BINDINGS
    }
}

impl Update for UserToken {
    fn update(&mut self, source: &Self) {
        self.clone_from(source);
    }
}
