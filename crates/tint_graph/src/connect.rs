//! Connecting sockets to plugs

use crate::error::{GraphError, Result};
use crate::node::{plug_handler, FilterNode, FilterPlug};
use tint_core::object::Ref;
use tint_core::observer;

/// Connect output `socket` of `source` to input `plug` of `target`.
///
/// The connector types must match, the plug must be free and the socket
/// must have room for another connection.
pub fn connect(
    source: &Ref<FilterNode>,
    socket: usize,
    target: &Ref<FilterNode>,
    plug: usize,
) -> Result<()> {
    if source.id() == target.id() {
        return Err(GraphError::SelfConnection(source.id()));
    }
    let socket_ref = source.socket(socket)?;
    let plug_ref = target.plug(plug)?;

    if plug_ref.is_connected() {
        return Err(GraphError::PlugOccupied {
            node: target.id(),
            index: plug,
        });
    }
    if !plug_ref.connector().accepts(socket_ref.connector()) {
        return Err(GraphError::TypeMismatch {
            socket: socket_ref.connector().data_type().to_string(),
            plug: plug_ref.connector().data_type().to_string(),
        });
    }
    let max = socket_ref.connector().max();
    if socket_ref.connection_count() >= max {
        return Err(GraphError::SocketFull {
            node: source.id(),
            index: socket,
            max,
        });
    }

    plug_ref.set_remote(Some(socket_ref.downgrade()));
    socket_ref.add_requesting(plug_ref.downgrade());
    observer::observe(plug_ref, socket_ref, Some(plug_handler()));
    log::debug!(
        "Connected {}:{} -> {}:{}",
        source.id(),
        socket,
        target.id(),
        plug
    );
    Ok(())
}

/// Remove the connection of `plug`. Returns `false` if it was not connected.
pub fn disconnect(plug: &Ref<FilterPlug>) -> bool {
    let Some(remote) = plug.set_remote(None) else {
        return false;
    };
    if let Some(socket) = remote.upgrade() {
        socket.remove_requesting(plug.id());
        observer::unobserve(plug, &socket);
    }
    true
}

/// Remove every connection of `node`, on both sides. Returns the number of
/// connections removed.
pub fn disconnect_node(node: &FilterNode) -> usize {
    let mut removed = 0;
    for plug in node.plugs() {
        if disconnect(plug) {
            removed += 1;
        }
    }
    for socket in node.sockets() {
        for plug in socket.requesting() {
            if disconnect(&plug) {
                removed += 1;
            }
        }
    }
    removed
}
