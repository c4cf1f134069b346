//! Init command for establishing the local user identity.

use std::io::Write;

use anyhow::Result;

use crate::identity;

/// Runs the init command.
pub fn run<W: Write>(writer: &mut W, name: Option<&str>) -> Result<()> {
    let identity = identity::init_identity(name)?;

    writeln!(writer, "User ID:  {}", identity.user_id)?;
    writeln!(writer, "Name:     {}", identity.name)?;
    writeln!(
        writer,
        "Saved to: {}",
        identity::identity_json_path()?.display()
    )?;

    Ok(())
}
