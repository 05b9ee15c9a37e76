use std::{fmt, net::IpAddr};

use log::{debug, warn};

use super::{DelayModel, IpZoneTable, LatencyError, ZoneEntry, ZoneLatencyMatrix};

/// Handles 1 and 10 belong to the root and default classes.
pub const FIRST_CLASS_HANDLE: u32 = 11;

/// A single `tc` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcCommand {
    args: Vec<String>,
    may_fail: bool,
}

impl TcCommand {
    fn new(line: impl AsRef<str>) -> Self {
        Self {
            args: line.as_ref().split_whitespace().map(str::to_string).collect(),
            may_fail: false,
        }
    }

    fn allow_failure(mut self) -> Self {
        self.may_fail = true;
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// A failure of this command does not abort the plan.
    pub fn may_fail(&self) -> bool {
        self.may_fail
    }
}

impl fmt::Display for TcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tc {}", self.args.join(" "))
    }
}

/// Shaping class for traffic towards one destination zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapingClass {
    pub handle: u32,
    pub zone: String,
    pub delay: DelayModel,
    pub targets: Vec<ZoneEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapingPlan {
    interface: String,
    local: ZoneEntry,
    classes: Vec<ShapingClass>,
}

impl ShapingPlan {
    /// Classes follow the matrix column order. Zones without latency from
    /// the local zone, or without any other host, get no class.
    pub fn build(
        interface: &str,
        local_ip: IpAddr,
        table: &IpZoneTable,
        matrix: &ZoneLatencyMatrix,
    ) -> Result<Self, LatencyError> {
        let local = table
            .lookup(local_ip)
            .cloned()
            .ok_or(LatencyError::ZoneNotFound(local_ip))?;

        let mut classes = Vec::new();
        let mut handle = FIRST_CLASS_HANDLE;
        for zone in matrix.zones() {
            let Some(latency) = matrix.latency(&local.zone, zone) else {
                continue;
            };
            let targets: Vec<ZoneEntry> = table
                .in_zone(zone)
                .filter(|entry| entry.ip != local.ip)
                .cloned()
                .collect();
            if targets.is_empty() {
                debug!("No hosts in zone {zone}, skipping");
                continue;
            }

            classes.push(ShapingClass {
                handle,
                zone: zone.clone(),
                delay: DelayModel::for_latency(latency)?,
                targets,
            });
            handle += 1;
        }

        if classes.is_empty() {
            warn!(
                "Nothing to shape from {} ({}) in zone {}",
                local.node, local.ip, local.zone
            );
        }

        Ok(Self {
            interface: interface.to_string(),
            local,
            classes,
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn local(&self) -> &ZoneEntry {
        &self.local
    }

    pub fn classes(&self) -> &[ShapingClass] {
        &self.classes
    }

    /// Replaces whatever root qdisc is installed: an htb root with a
    /// default fair-queued class, and one netem class per destination zone.
    pub fn commands(&self) -> Vec<TcCommand> {
        let iface = &self.interface;
        let mut commands = unset_commands(iface);
        commands.extend([
            TcCommand::new(format!("qdisc add dev {iface} root handle 1: htb default 10")),
            TcCommand::new(format!("class add dev {iface} parent 1: classid 1:1 htb rate 1gbit")),
            TcCommand::new(format!(
                "class add dev {iface} parent 1:1 classid 1:10 htb rate 1gbit"
            )),
            TcCommand::new(format!("qdisc add dev {iface} parent 1:10 handle 10: sfq perturb 10")),
        ]);

        for class in &self.classes {
            let handle = class.handle;
            commands.push(TcCommand::new(format!(
                "class add dev {iface} parent 1:1 classid 1:{handle} htb rate 1gbit"
            )));
            commands.push(TcCommand::new(format!(
                "qdisc add dev {iface} parent 1:{handle} handle {handle}: netem delay {:.2}ms {:.2}ms distribution normal",
                class.delay.mean_ms(),
                class.delay.jitter_ms(),
            )));
            for target in &class.targets {
                commands.push(TcCommand::new(format!(
                    "filter add dev {iface} protocol ip parent 1: prio 1 u32 match ip dst {}/32 flowid 1:{handle}",
                    target.ip
                )));
            }
        }

        commands
    }
}

/// Removes every rule from the interface. Fails harmlessly when none exist.
pub fn unset_commands(interface: &str) -> Vec<TcCommand> {
    vec![TcCommand::new(format!("qdisc del dev {interface} root")).allow_failure()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> IpZoneTable {
        let csv = "Node,IP,Zone\n\
                   validator001,10.0.0.1,east\n\
                   validator002,10.0.0.2,west\n\
                   validator003,10.0.0.3,east\n\
                   validator004,10.0.0.4,north\n";
        IpZoneTable::from_reader(csv.as_bytes(), "inline").unwrap()
    }

    fn matrix() -> ZoneLatencyMatrix {
        let csv = "from/to,west,east,north,south\n\
                   east,40,0.4,90,15\n\
                   west,41,0,0,0\n";
        ZoneLatencyMatrix::from_reader(csv.as_bytes(), "inline").unwrap()
    }

    fn local() -> IpAddr {
        "10.0.0.1".parse().unwrap()
    }

    #[test]
    fn one_class_per_reachable_zone() {
        let plan = ShapingPlan::build("eth0", local(), &table(), &matrix()).unwrap();
        assert_eq!(plan.local().node, "validator001");

        let classes: Vec<(u32, &str, f64)> = plan
            .classes()
            .iter()
            .map(|c| (c.handle, c.zone.as_str(), c.delay.mean_ms()))
            .collect();
        // south has latency but no hosts
        assert_eq!(classes, vec![(11, "west", 40.0), (12, "east", 0.4), (13, "north", 90.0)]);
    }

    #[test]
    fn local_host_is_not_a_target() {
        let plan = ShapingPlan::build("eth0", local(), &table(), &matrix()).unwrap();
        let east = &plan.classes()[1];
        let ips: Vec<String> = east.targets.iter().map(|t| t.ip.to_string()).collect();
        assert_eq!(ips, vec!["10.0.0.3"]);
    }

    #[test]
    fn renders_tc_commands() {
        let plan = ShapingPlan::build("eth0", local(), &table(), &matrix()).unwrap();
        let commands: Vec<String> = plan.commands().iter().map(ToString::to_string).collect();
        assert_eq!(
            commands,
            vec![
                "tc qdisc del dev eth0 root",
                "tc qdisc add dev eth0 root handle 1: htb default 10",
                "tc class add dev eth0 parent 1: classid 1:1 htb rate 1gbit",
                "tc class add dev eth0 parent 1:1 classid 1:10 htb rate 1gbit",
                "tc qdisc add dev eth0 parent 1:10 handle 10: sfq perturb 10",
                "tc class add dev eth0 parent 1:1 classid 1:11 htb rate 1gbit",
                "tc qdisc add dev eth0 parent 1:11 handle 11: netem delay 40.00ms 2.00ms distribution normal",
                "tc filter add dev eth0 protocol ip parent 1: prio 1 u32 match ip dst 10.0.0.2/32 flowid 1:11",
                "tc class add dev eth0 parent 1:1 classid 1:12 htb rate 1gbit",
                "tc qdisc add dev eth0 parent 1:12 handle 12: netem delay 0.40ms 0.02ms distribution normal",
                "tc filter add dev eth0 protocol ip parent 1: prio 1 u32 match ip dst 10.0.0.3/32 flowid 1:12",
                "tc class add dev eth0 parent 1:1 classid 1:13 htb rate 1gbit",
                "tc qdisc add dev eth0 parent 1:13 handle 13: netem delay 90.00ms 4.50ms distribution normal",
                "tc filter add dev eth0 protocol ip parent 1: prio 1 u32 match ip dst 10.0.0.4/32 flowid 1:13",
            ]
        );
        assert!(plan.commands()[0].may_fail());
        assert!(plan.commands()[1..].iter().all(|c| !c.may_fail()));
    }

    #[test]
    fn unknown_local_ip_has_no_zone() {
        let err = ShapingPlan::build("eth0", "10.9.9.9".parse().unwrap(), &table(), &matrix())
            .unwrap_err();
        assert!(matches!(err, LatencyError::ZoneNotFound(_)));
    }

    #[test]
    fn zone_without_latencies_gets_only_the_base_rules() {
        let ip = "10.0.0.4".parse().unwrap();
        let plan = ShapingPlan::build("eth1", ip, &table(), &matrix()).unwrap();
        assert!(plan.classes().is_empty());
        assert_eq!(plan.commands().len(), 5);
    }
}
