//! Signal ⇄ port bookkeeping.
//!
//! Every write to `Signal::connected_ports` or `Port::connected_signal` goes
//! through this module, so the two lists never disagree. Destroying a signal,
//! a port, a wire or a whole module here leaves no dangling back-reference.

use log::{debug, trace};

use crate::{
    components::{Hierarchy, ModuleInst, Port, Signal, Wire},
    ecs::{Entity, World},
    unwrap_option_or_continue, unwrap_option_or_return,
    vector::Vec2i,
};

pub fn create_signal(world: &mut World, name: impl Into<String>) -> Entity {
    let signal = world.create();
    world.insert(
        signal,
        Signal {
            name: name.into(),
            connected_ports: vec![],
        },
    );
    signal
}

/// Signal the port is currently on, ignoring references to dead signals.
pub fn port_signal(world: &World, port: Entity) -> Option<Entity> {
    world
        .get::<Port>(port)?
        .connected_signal
        .filter(|s| world.has::<Signal>(*s))
}

/// Moves `port` onto `signal`, leaving whatever signal it was on before.
pub fn connect_port(world: &mut World, signal: Entity, port: Entity) -> bool {
    if !world.has::<Signal>(signal) || !world.has::<Port>(port) {
        return false;
    }

    if port_signal(world, port) == Some(signal) {
        return true;
    }
    disconnect_port(world, port);

    if let Some(sig) = world.get_mut::<Signal>(signal) {
        if !sig.connected_ports.contains(&port) {
            sig.connected_ports.push(port);
        }
    }
    if let Some(p) = world.get_mut::<Port>(port) {
        p.connected_signal = Some(signal);
    }
    true
}

pub fn disconnect_port(world: &mut World, port: Entity) {
    let port_data = unwrap_option_or_return!(world.get_mut::<Port>(port));
    let signal = unwrap_option_or_return!(port_data.connected_signal.take());

    if let Some(sig) = world.get_mut::<Signal>(signal) {
        sig.connected_ports.retain(|p| *p != port);
    }
}

/// Clears the back-reference of every port on the signal, then destroys it.
pub fn destroy_signal(world: &mut World, signal: Entity) {
    let sig = unwrap_option_or_return!(world.remove::<Signal>(signal));

    for port in sig.connected_ports {
        let port = unwrap_option_or_continue!(world.get_mut::<Port>(port));
        if port.connected_signal == Some(signal) {
            port.connected_signal = None;
        }
    }

    debug!("destroyed signal {} ({signal})", sig.name);
    world.destroy(signal);
}

/// Moves every port and wire of `absorbed` onto `kept` and destroys `absorbed`.
pub fn merge_signals(world: &mut World, kept: Entity, absorbed: Entity) {
    if kept == absorbed || !world.has::<Signal>(kept) {
        return;
    }
    let ports = unwrap_option_or_return!(world.get::<Signal>(absorbed)).connected_ports.clone();

    for port in ports {
        connect_port(world, kept, port);
    }
    world.each_mut::<Wire>(|_, wire| {
        if wire.signal == absorbed {
            wire.signal = kept;
        }
    });

    trace!("merged signal {absorbed} into {kept}");
    destroy_signal(world, absorbed);
}

/// Module a connection endpoint belongs to. Wire junctions belong to none.
pub fn endpoint_module(world: &World, endpoint: Entity) -> Option<Entity> {
    world
        .get::<Port>(endpoint)
        .map(|p| p.owner)
        .filter(|m| world.has::<ModuleInst>(*m))
}

/// Signal already carried by an endpoint, whether it is a port or a wire.
pub fn endpoint_signal(world: &World, endpoint: Entity) -> Option<Entity> {
    if let Some(wire) = world.get::<Wire>(endpoint) {
        return Some(wire.signal).filter(|s| world.has::<Signal>(*s));
    }
    port_signal(world, endpoint)
}

/// Fresh signal named after its own id.
fn create_net(world: &mut World) -> Entity {
    let signal = create_signal(world, "");
    let name = format!("net_{}", signal.id());
    if let Some(sig) = world.get_mut::<Signal>(signal) {
        sig.name = name;
    }
    signal
}

/// Creates a wire between two endpoints and hooks it into a signal.
///
/// The wire joins a signal an endpoint already carries; two different signals
/// are merged. With none, a fresh signal is created. Port endpoints end up on
/// the wire's signal.
pub fn create_wire(world: &mut World, from: Entity, to: Entity, points: Vec<Vec2i>) -> Entity {
    let signal = match (endpoint_signal(world, from), endpoint_signal(world, to)) {
        (Some(a), Some(b)) => {
            merge_signals(world, a, b);
            a
        }
        (Some(s), None) | (None, Some(s)) => s,
        (None, None) => create_net(world),
    };

    for endpoint in [from, to] {
        if world.has::<Port>(endpoint) {
            connect_port(world, signal, endpoint);
        }
    }

    let wire = world.create();
    world.insert(
        wire,
        Wire {
            signal,
            from_endpoint: from,
            to_endpoint: to,
            points,
        },
    );
    debug!("created wire {wire} on signal {signal} ({from} -> {to})");
    wire
}

/// Destroys a wire along with every wire branching off it.
///
/// What is left of its signal is regrouped: each group of wires still joined
/// together keeps or gets a signal of its own, and a signal with no wire left dies.
pub fn delete_wire(world: &mut World, wire: Entity) -> bool {
    let Some(removed) = world.remove::<Wire>(wire) else {
        return false;
    };
    world.destroy(wire);

    for branch in wires_touching(world, wire) {
        delete_wire(world, branch);
    }
    if world.has::<Signal>(removed.signal) {
        regroup_signal(world, removed.signal);
    }
    true
}

/// Splits a signal into one signal per connected group of its wires.
///
/// Two wires are joined when they share a port or one ends on the other. The
/// first group keeps `signal`; ports no wire reaches anymore are disconnected.
fn regroup_signal(world: &mut World, signal: Entity) {
    let wires: Vec<(Entity, [Entity; 2])> = world
        .view::<(Wire,)>()
        .iter()
        .filter(|(_, (w,))| w.signal == signal)
        .map(|(e, (w,))| (e, w.endpoints()))
        .collect();

    if wires.is_empty() {
        destroy_signal(world, signal);
        return;
    }

    let joined = |a: &(Entity, [Entity; 2]), b: &(Entity, [Entity; 2])| {
        a.1.iter().any(|e| b.1.contains(e)) || a.1.contains(&b.0) || b.1.contains(&a.0)
    };

    let mut grouped = vec![false; wires.len()];
    let mut groups: Vec<Vec<usize>> = vec![];
    for first in 0..wires.len() {
        if grouped[first] {
            continue;
        }
        grouped[first] = true;
        let mut group = vec![first];
        let mut next = 0;
        while next < group.len() {
            let current = wires[group[next]];
            for (i, other) in wires.iter().enumerate() {
                if !grouped[i] && joined(&current, other) {
                    grouped[i] = true;
                    group.push(i);
                }
            }
            next += 1;
        }
        groups.push(group);
    }

    let group_ports = |world: &World, group: &[usize]| -> Vec<Entity> {
        let mut ports: Vec<Entity> = vec![];
        for port in group.iter().flat_map(|i| wires[*i].1) {
            if world.has::<Port>(port) && !ports.contains(&port) {
                ports.push(port);
            }
        }
        ports
    };

    let kept_ports = group_ports(world, &groups[0]);
    let on_signal = world
        .get::<Signal>(signal)
        .map(|s| s.connected_ports.clone())
        .unwrap_or_default();
    for port in on_signal {
        if !kept_ports.contains(&port) {
            disconnect_port(world, port);
        }
    }

    for group in &groups[1..] {
        let split = create_net(world);
        for port in group_ports(world, group) {
            connect_port(world, split, port);
        }
        for i in group {
            if let Some(w) = world.get_mut::<Wire>(wires[*i].0) {
                w.signal = split;
            }
        }
        debug!("split {} wires off signal {signal} onto {split}", group.len());
    }
}

/// Wires with `endpoint` as either end.
pub fn wires_touching(world: &World, endpoint: Entity) -> Vec<Entity> {
    world
        .view::<(Wire,)>()
        .iter()
        .filter(|(_, (w,))| w.touches(endpoint))
        .map(|(e, _)| e)
        .collect()
}

pub fn destroy_port(world: &mut World, port: Entity) {
    for wire in wires_touching(world, port) {
        delete_wire(world, wire);
    }
    disconnect_port(world, port);
    world.destroy(port);
}

/// Destroys a module, its ports and every wire attached to those ports.
pub fn destroy_module(world: &mut World, module: Entity) -> bool {
    if !world.has::<ModuleInst>(module) {
        return false;
    }

    let children = world
        .get::<Hierarchy>(module)
        .map(|h| h.children.clone())
        .unwrap_or_default();
    for port in children {
        destroy_port(world, port);
    }

    debug!("destroyed module {module}");
    world.destroy(module)
}

/// Checks that every signal's port list and every port's back-reference agree.
pub fn is_consistent(world: &World) -> bool {
    let signals_ok = world.view::<(Signal,)>().iter().all(|(signal, (sig,))| {
        sig.connected_ports
            .iter()
            .all(|p| world.get::<Port>(*p).is_some_and(|port| port.connected_signal == Some(signal)))
    });

    let ports_ok = world.view::<(Port,)>().iter().all(|(port, (p,))| match p.connected_signal {
        None => true,
        Some(signal) => world
            .get::<Signal>(signal)
            .is_some_and(|s| s.connected_ports.contains(&port)),
    });

    signals_ok && ports_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gates::{spawn_gate, GateKind}, grid::Grid};

    fn ports_of(world: &World, module: Entity) -> Vec<Entity> {
        world.get::<Hierarchy>(module).unwrap().children.clone()
    }

    fn two_gates() -> (World, Vec<Entity>, Vec<Entity>) {
        let mut world = World::new();
        let grid = Grid::default();
        let m1 = spawn_gate(&mut world, &grid, GateKind::And, Vec2i::new(0, 0), "AND_1".into());
        let m2 = spawn_gate(&mut world, &grid, GateKind::And, Vec2i::new(40, 0), "AND_2".into());
        let p1 = ports_of(&world, m1);
        let p2 = ports_of(&world, m2);
        (world, p1, p2)
    }

    #[test]
    fn wire_between_free_ports_makes_a_signal() {
        let (mut world, p1, p2) = two_gates();
        let wire = create_wire(&mut world, p1[2], p2[0], vec![Vec2i::new(20, 8), Vec2i::new(40, 8)]);

        let signal = world.get::<Wire>(wire).unwrap().signal;
        assert_eq!(world.get::<Signal>(signal).unwrap().connected_ports, vec![p1[2], p2[0]]);
        assert_eq!(port_signal(&world, p2[0]), Some(signal));
        assert!(is_consistent(&world));
    }

    #[test]
    fn fan_out_reuses_signal() {
        let (mut world, p1, p2) = two_gates();
        let a = create_wire(&mut world, p1[2], p2[0], vec![]);
        let b = create_wire(&mut world, p1[2], p2[1], vec![]);

        let signal = world.get::<Wire>(a).unwrap().signal;
        assert_eq!(world.get::<Wire>(b).unwrap().signal, signal);
        assert_eq!(world.count::<Signal>(), 1);
        assert_eq!(world.get::<Signal>(signal).unwrap().connected_ports.len(), 3);
    }

    #[test]
    fn joining_two_nets_merges_them() {
        let (mut world, p1, p2) = two_gates();
        let a = create_wire(&mut world, p1[0], p2[2], vec![]);
        let b = create_wire(&mut world, p1[1], p1[2], vec![]);
        assert_eq!(world.count::<Signal>(), 2);

        let c = create_wire(&mut world, a, b, vec![]);
        assert_eq!(world.count::<Signal>(), 1);
        let signal = world.get::<Wire>(c).unwrap().signal;
        assert_eq!(world.get::<Wire>(a).unwrap().signal, signal);
        assert_eq!(world.get::<Wire>(b).unwrap().signal, signal);
        assert_eq!(world.get::<Signal>(signal).unwrap().connected_ports.len(), 4);
        assert!(is_consistent(&world));
    }

    #[test]
    fn deleting_last_wire_detaches_ports() {
        let (mut world, p1, p2) = two_gates();
        let wire = create_wire(&mut world, p1[2], p2[0], vec![]);
        let signal = world.get::<Wire>(wire).unwrap().signal;

        assert!(delete_wire(&mut world, wire));
        assert!(!world.is_alive(signal));
        assert_eq!(world.get::<Port>(p1[2]).unwrap().connected_signal, None);
        assert_eq!(world.get::<Port>(p2[0]).unwrap().connected_signal, None);
        assert!(!delete_wire(&mut world, wire));
    }

    #[test]
    fn deleting_one_branch_keeps_the_rest() {
        let (mut world, p1, p2) = two_gates();
        let a = create_wire(&mut world, p1[2], p2[0], vec![]);
        let b = create_wire(&mut world, p1[2], p2[1], vec![]);
        let signal = world.get::<Wire>(a).unwrap().signal;

        delete_wire(&mut world, b);
        assert!(world.is_alive(signal));
        assert_eq!(world.get::<Signal>(signal).unwrap().connected_ports, vec![p1[2], p2[0]]);
        assert_eq!(world.get::<Port>(p2[1]).unwrap().connected_signal, None);
        assert!(is_consistent(&world));
    }

    #[test]
    fn deleting_bridge_splits_nets() {
        let (mut world, p1, p2) = two_gates();
        let a = create_wire(&mut world, p1[2], p2[0], vec![]);
        let b = create_wire(&mut world, p1[0], p2[2], vec![]);
        let bridge = create_wire(&mut world, a, b, vec![]);
        assert_eq!(world.count::<Signal>(), 1);

        assert!(delete_wire(&mut world, bridge));
        let sa = world.get::<Wire>(a).unwrap().signal;
        let sb = world.get::<Wire>(b).unwrap().signal;
        assert_ne!(sa, sb);
        assert_eq!(world.count::<Signal>(), 2);

        let mut on_a = world.get::<Signal>(sa).unwrap().connected_ports.clone();
        let mut on_b = world.get::<Signal>(sb).unwrap().connected_ports.clone();
        on_a.sort();
        on_b.sort();
        let mut want_a = vec![p1[2], p2[0]];
        let mut want_b = vec![p1[0], p2[2]];
        want_a.sort();
        want_b.sort();
        assert_eq!(on_a, want_a);
        assert_eq!(on_b, want_b);
        assert_eq!(port_signal(&world, p2[2]), Some(sb));
        assert!(is_consistent(&world));
    }

    #[test]
    fn deleting_trunk_removes_its_branches() {
        let (mut world, p1, p2) = two_gates();
        let trunk = create_wire(&mut world, p1[2], p2[0], vec![]);
        let branch = create_wire(&mut world, trunk, p2[1], vec![]);
        let signal = world.get::<Wire>(trunk).unwrap().signal;

        assert!(delete_wire(&mut world, trunk));
        assert!(!world.is_alive(branch));
        assert!(!world.is_alive(signal));
        assert_eq!(world.count::<Wire>(), 0);
        for port in [p1[2], p2[0], p2[1]] {
            assert_eq!(world.get::<Port>(port).unwrap().connected_signal, None);
        }
        assert!(is_consistent(&world));
    }

    #[test]
    fn deleting_a_branch_keeps_the_trunk() {
        let (mut world, p1, p2) = two_gates();
        let trunk = create_wire(&mut world, p1[2], p2[0], vec![]);
        let branch = create_wire(&mut world, trunk, p2[1], vec![]);
        let signal = world.get::<Wire>(trunk).unwrap().signal;

        assert!(delete_wire(&mut world, branch));
        assert!(world.is_alive(trunk));
        assert_eq!(world.get::<Signal>(signal).unwrap().connected_ports, vec![p1[2], p2[0]]);
        assert_eq!(port_signal(&world, p2[1]), None);
        assert!(is_consistent(&world));
    }

    #[test]
    fn module_deletion_cascades() {
        let (mut world, p1, p2) = two_gates();
        let module = world.get::<Port>(p1[0]).unwrap().owner;
        let wire = create_wire(&mut world, p1[2], p2[0], vec![]);

        assert!(destroy_module(&mut world, module));
        assert!(!world.is_alive(module));
        assert!(p1.iter().all(|p| !world.is_alive(*p)));
        assert!(!world.is_alive(wire));
        assert_eq!(world.count::<Signal>(), 0);
        assert_eq!(world.get::<Port>(p2[0]).unwrap().connected_signal, None);
    }
}
