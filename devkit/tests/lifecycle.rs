//! Register / compare / delete / update against the in-memory inventory

use netbox_devkit::{FactsBuilder, MockCall, TestHarness};
use netbox_register::discovery::SystemFacts;
use netbox_register::inventory::NewVirtualMachine;
use netbox_register::lifecycle::FailedStep;
use netbox_register::reconcile::DiffRow;
use netbox_register::RegisterError;

fn web01() -> SystemFacts {
    FactsBuilder::new("web01")
        .vcpus(4)
        .memory_mb(20480)
        .disk_gb(40)
        .interface("eth0", "52:54:00:ab:cd:01", "172.24.1.10", "web01.mgmt.example.com")
        .interface("eth1", "52:54:00:ab:cd:02", "10.20.0.10", "web01.example.com")
        .build()
}

#[test]
fn test_register_creates_vm_interfaces_and_ips() {
    let harness = TestHarness::new();
    let report = harness.registrar().register(&web01()).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.vm.name, "web01");
    assert_eq!(report.interfaces.len(), 2);

    let vm = harness.inventory.vm("web01").unwrap();
    assert_eq!(vm.vcpus, Some(4.0));
    assert_eq!(vm.memory, Some(20480));
    assert_eq!(vm.disk, Some(40));
    assert_eq!(harness.inventory.interface_names(vm.id), vec!["eth0", "eth1"]);
    assert_eq!(harness.inventory.ip_count(), 2);
}

#[test]
fn test_register_twice_is_an_error() {
    let harness = TestHarness::new();
    let registrar = harness.registrar();
    registrar.register(&web01()).unwrap();

    let err = registrar.register(&web01()).unwrap_err();
    assert!(matches!(err, RegisterError::AlreadyExists(ref host) if host == "web01"));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(harness.inventory.vm_count(), 1);
}

#[test]
fn test_register_then_compare_matches() {
    let harness = TestHarness::new();
    let registrar = harness.registrar();
    let facts = web01();

    registrar.register(&facts).unwrap();
    let comparison = registrar.compare(&facts).unwrap();

    assert!(comparison.all_match(), "{:?}", comparison.rows);
    assert_eq!(comparison.rows.len(), 3 + 2 * 3);
    assert_eq!(comparison.rows[0], DiffRow::new("vCPUs", "4", "4", true));
    assert_eq!(comparison.rows[1], DiffRow::new("Disk", "40", "40", true));
    assert_eq!(comparison.rows[2], DiffRow::new("Memory", "20480", "20480", true));
}

#[test]
fn test_compare_reports_memory_drift() {
    let harness = TestHarness::new();
    let registrar = harness.registrar();
    let facts = web01();

    registrar.register(&facts).unwrap();
    harness.inventory.set_memory("web01", 10240);

    let comparison = registrar.compare(&facts).unwrap();
    assert!(!comparison.all_match());
    let diffs: Vec<_> = comparison.differences().cloned().collect();
    assert_eq!(diffs, vec![DiffRow::new("Memory", "20480", "10240", false)]);
}

#[test]
fn test_compare_is_read_only() {
    let harness = TestHarness::new();
    let registrar = harness.registrar();
    registrar.register(&web01()).unwrap();
    harness.inventory.clear_calls();

    registrar.compare(&web01()).unwrap();
    assert!(harness.inventory.write_calls().is_empty());
}

#[test]
fn test_compare_unregistered_host() {
    let harness = TestHarness::new();
    let err = harness.registrar().compare(&web01()).unwrap_err();
    assert!(matches!(err, RegisterError::NotFound(ref host) if host == "web01"));
}

#[test]
fn test_compare_with_interface_missing_remotely() {
    let harness = TestHarness::new();
    let registrar = harness.registrar();
    registrar.register(&web01()).unwrap();

    let facts = FactsBuilder::new("web01")
        .vcpus(4)
        .memory_mb(20480)
        .disk_gb(40)
        .interface("eth0", "52:54:00:ab:cd:01", "172.24.1.10", "web01.mgmt.example.com")
        .interface("eth1", "52:54:00:ab:cd:02", "10.20.0.10", "web01.example.com")
        .interface("eth2", "52:54:00:ab:cd:03", "10.30.0.10", "web01-backup.example.com")
        .build();

    let comparison = registrar.compare(&facts).unwrap();
    let eth2: Vec<_> = comparison
        .rows
        .iter()
        .filter(|row| row.parameter.ends_with("(eth2)"))
        .collect();

    assert_eq!(eth2.len(), 3);
    assert!(eth2.iter().all(|row| !row.matches && row.remote.is_empty()));
}

#[test]
fn test_delete_twice_is_not_found() {
    let harness = TestHarness::new();
    let registrar = harness.registrar();
    registrar.register(&web01()).unwrap();

    registrar.delete("web01").unwrap();
    assert_eq!(harness.inventory.vm_count(), 0);

    let err = registrar.delete("web01").unwrap_err();
    assert!(matches!(err, RegisterError::NotFound(ref host) if host == "web01"));
    assert_eq!(err.to_string(), "\"web01\" does not exist");
}

#[test]
fn test_update_without_prior_record_registers() {
    let harness = TestHarness::new();
    let report = harness.registrar().update(&web01()).unwrap();

    assert_eq!(report.vm.name, "web01");
    assert_eq!(harness.inventory.vm_count(), 1);
}

#[test]
fn test_update_replaces_record() {
    let harness = TestHarness::new();
    let registrar = harness.registrar();
    let old = registrar.register(&web01()).unwrap();

    let grown = FactsBuilder::new("web01")
        .vcpus(8)
        .memory_mb(40960)
        .disk_gb(40)
        .interface("eth0", "52:54:00:ab:cd:01", "172.24.1.10", "web01.mgmt.example.com")
        .build();
    let new = registrar.update(&grown).unwrap();

    assert_ne!(old.vm.id, new.vm.id);
    assert_eq!(harness.inventory.vm_count(), 1);
    assert_eq!(harness.inventory.ip_count(), 1);
    assert!(registrar.compare(&grown).unwrap().all_match());

    let calls = harness.inventory.calls();
    let delete = calls.iter().position(|c| *c == MockCall::DeleteVm(old.vm.id));
    let create = calls.iter().rposition(|c| *c == MockCall::CreateVm("web01".into()));
    assert!(delete.unwrap() < create.unwrap());
}

#[test]
fn test_primary_ip_only_for_management_range() {
    let harness = TestHarness::new();
    let report = harness.registrar().register(&web01()).unwrap();

    let patches = harness.inventory.primary_ip_patches();
    assert_eq!(patches.len(), 1);

    let eth0 = &report.interfaces[0];
    assert!(eth0.primary);
    assert!(!report.interfaces[1].primary);
    assert_eq!(
        patches[0],
        MockCall::UpdateVm {
            id: report.vm.id,
            primary_ip4: eth0.ip.as_ref().map(|ip| ip.id),
        }
    );

    let vm = harness.inventory.vm("web01").unwrap();
    assert_eq!(vm.primary_ip4.unwrap().address, "172.24.1.10/32");
}

#[test]
fn test_no_primary_ip_outside_management_ranges() {
    let harness = TestHarness::new().with_management_ranges(&["192.168.100.0/24"]);
    harness.registrar().register(&web01()).unwrap();

    assert!(harness.inventory.primary_ip_patches().is_empty());
    assert!(harness.inventory.vm("web01").unwrap().primary_ip4.is_none());
}

#[test]
fn test_ineligible_interfaces_are_not_registered() {
    let harness = TestHarness::new();
    let facts = FactsBuilder::new("db01")
        .interface("lo", "00:00:00:00:00:00", "127.0.0.1", "localhost")
        .interface_without_ip("eth1", "52:54:00:00:00:11")
        .interface("eth0", "52:54:00:00:00:10", "10.20.0.20", "db01.example.com")
        .build();

    let registrar = harness.registrar();
    let report = registrar.register(&facts).unwrap();
    assert_eq!(
        harness.inventory.interface_names(report.vm.id),
        vec!["eth0"]
    );

    let comparison = registrar.compare(&facts).unwrap();
    assert!(comparison
        .rows
        .iter()
        .all(|row| !row.parameter.contains("(lo)") && !row.parameter.contains("(eth1)")));
}

#[test]
fn test_interface_failure_does_not_abort_registration() {
    let harness = TestHarness::new();
    harness.inventory.fail_interface("eth0");

    let report = harness.registrar().register(&web01()).unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "eth0");
    assert_eq!(report.failures[0].step, FailedStep::Interface);

    // the VM stays, eth1 is still registered
    let vm = harness.inventory.vm("web01").unwrap();
    assert_eq!(harness.inventory.interface_names(vm.id), vec!["eth1"]);
    assert!(harness.inventory.primary_ip_patches().is_empty());
}

#[test]
fn test_ip_failure_keeps_interface() {
    let harness = TestHarness::new();
    harness.inventory.fail_ip("172.24.1.10");

    let report = harness.registrar().register(&web01()).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].step, FailedStep::IpAddress);
    assert_eq!(report.interfaces.len(), 2);
    assert!(report.interfaces[0].ip.is_none());
    assert_eq!(harness.inventory.ip_count(), 1);
    assert!(harness.inventory.primary_ip_patches().is_empty());
}

#[test]
fn test_rejected_token_is_auth_error() {
    let harness = TestHarness::new();
    harness.inventory.reject_token();

    let err = harness.registrar().register(&web01()).unwrap_err();
    assert!(matches!(err, RegisterError::Auth(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_compare_record_registered_elsewhere() {
    let harness = TestHarness::new();
    harness.inventory.seed_vm(&NewVirtualMachine {
        name: "web01".to_string(),
        vcpus: 4,
        memory: 20480,
        disk: 40,
        cluster: None,
        role: None,
        platform: None,
    });

    let registrar = harness.registrar();
    assert!(matches!(
        registrar.register(&web01()),
        Err(RegisterError::AlreadyExists(_))
    ));

    // sizes match, but no interface was ever recorded
    let comparison = registrar.compare(&web01()).unwrap();
    assert!(comparison.rows[..3].iter().all(|row| row.matches));
    assert_eq!(comparison.differences().count(), 6);
}
