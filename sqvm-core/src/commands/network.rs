//! Sessões de rede a partir do script

use super::{num, reply, text, CommandRegistry};
use crate::exec::{Exec, Reply};
use crate::fault::{Checked, Diagnostics, Reporter};
use crate::network::SessionId;
use crate::value::Value;

use crate::value::ValueType::{Scalar, String as Str};

pub(super) fn register(table: &mut CommandRegistry) {
    table.add_unary("connectTo", Str, connect_to);
    table.add_unary("connectionStatus", Scalar, |ex, v| {
        let status = session(&v).and_then(|id| ex.vm.network.status(id));
        reply(status.map(|state| state.to_string()).unwrap_or_default())
    });
    table.add_unary("disconnect", Scalar, |ex, v| {
        let closed = session(&v).is_some_and(|id| ex.vm.network.disconnect(id));
        reply(closed)
    });
}

/// Ids negativos ou fracionários não existem
fn session(value: &Value) -> Option<SessionId> {
    let n = num(value);
    (n >= 0.0 && n.fract() == 0.0).then(|| SessionId(n as u64))
}

/// Devolve o id da sessão, ou `-1` quando nenhuma foi aberta
fn connect_to(ex: &mut Exec<'_>, right: Value) -> Checked<Reply> {
    let location = ex.location();
    let vm = &mut *ex.vm;
    let enabled = vm.config.networking_enabled;
    let mut reporter = Reporter::new(&mut vm.logger, location);
    let session = vm.network.connect(&mut reporter, enabled, text(&right))?;
    reply(session.map_or(-1.0, |id| id.0 as f64))
}
