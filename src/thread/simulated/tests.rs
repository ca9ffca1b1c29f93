use {
    crate::{
        mainloop::MainloopContext,
        ot_error::OtError,
        thread::{
            controller::{AttachParams, JoinerParams, ThreadController},
            simulated::SimulatedController,
            types::{DeviceRole, Ip6Prefix, OnMeshPrefix},
        },
    },
    std::{cell::RefCell, rc::Rc, time::Duration},
};

fn params() -> AttachParams {
    AttachParams {
        network_key: vec![0x11; 16],
        pan_id: 0x1234,
        network_name: "TestNet".to_owned(),
        ext_pan_id: 0xdead_beef,
        pskc: vec![],
        channel_mask: 1 << 15,
    }
}

fn run(c: &SimulatedController) {
    let mut ctx = MainloopContext::new();
    c.update(&mut ctx);
    c.process(&ctx);
}

#[test]
fn attach_completes_on_process() {
    let c = SimulatedController::new();
    let roles = Rc::new(RefCell::new(vec![]));
    let r = roles.clone();
    c.add_device_role_handler(Box::new(move |role| r.borrow_mut().push(role)));
    let res = Rc::new(RefCell::new(None));
    let r = res.clone();
    c.attach(Some(params()), Box::new(move |v| *r.borrow_mut() = Some(v)));
    assert!(res.borrow().is_none());

    let mut ctx = MainloopContext::new();
    c.update(&mut ctx);
    assert_eq!(ctx.timeout, Duration::ZERO);
    c.process(&ctx);

    assert_eq!(*res.borrow(), Some(Ok(0)));
    assert_eq!(*roles.borrow(), [DeviceRole::Leader]);
    assert_eq!(c.device_role(), DeviceRole::Leader);
    assert_eq!(c.channel().unwrap(), 15);
    assert_eq!(c.network_name().unwrap(), "TestNet");
    assert!(!c.active_dataset_tlvs().unwrap().is_empty());
    assert!(!c.has_pending_tasks());
}

#[test]
fn attach_validates_params() {
    let c = SimulatedController::new();
    let res = Rc::new(RefCell::new(vec![]));
    let r = res.clone();
    c.attach(
        Some(AttachParams {
            network_key: vec![1; 15],
            ..params()
        }),
        Box::new(move |v| r.borrow_mut().push(v)),
    );
    let r = res.clone();
    c.attach(
        Some(AttachParams {
            channel_mask: 1 << 5,
            ..params()
        }),
        Box::new(move |v| r.borrow_mut().push(v)),
    );
    let r = res.clone();
    c.attach(None, Box::new(move |v| r.borrow_mut().push(v)));
    run(&c);
    assert_eq!(
        *res.borrow(),
        [
            Err(OtError::InvalidArgs),
            Err(OtError::InvalidArgs),
            Err(OtError::InvalidState),
        ]
    );
    assert_eq!(c.device_role(), DeviceRole::Disabled);
}

#[test]
fn dataset_handlers() {
    let c = SimulatedController::new();
    let seen = Rc::new(RefCell::new(vec![]));
    let s = seen.clone();
    c.add_active_dataset_change_handler(Box::new(move |tlvs| s.borrow_mut().push(tlvs.to_vec())));
    c.set_active_dataset_tlvs(vec![1, 2, 3]).unwrap();
    assert_eq!(*seen.borrow(), [vec![1, 2, 3]]);
    assert_eq!(c.set_active_dataset_tlvs(vec![0; 255]), Err(OtError::InvalidArgs));
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn attach_all_nodes_requires_attached() {
    let c = SimulatedController::new();
    let res = Rc::new(RefCell::new(vec![]));
    let r = res.clone();
    c.attach_all_nodes_to(vec![1], Box::new(move |v| r.borrow_mut().push(v)));
    run(&c);
    c.attach(Some(params()), Box::new(|_| ()));
    run(&c);
    let r = res.clone();
    c.attach_all_nodes_to(vec![], Box::new(move |v| r.borrow_mut().push(v)));
    let r = res.clone();
    c.attach_all_nodes_to(vec![1], Box::new(move |v| r.borrow_mut().push(v)));
    run(&c);
    let res = res.borrow();
    assert_eq!(res[0], Err(OtError::InvalidState));
    assert_eq!(res[1], Err(OtError::InvalidArgs));
    assert!(matches!(res[2], Ok(delay) if delay > 0));
}

#[test]
fn joiner() {
    let c = SimulatedController::new();
    let res = Rc::new(RefCell::new(vec![]));
    let r = res.clone();
    let bad = JoinerParams {
        pskd: "J01NMEIO".to_owned(),
        ..Default::default()
    };
    c.joiner_start(bad, Box::new(move |v| r.borrow_mut().push(v)));
    assert_eq!(*res.borrow(), [Err(OtError::InvalidArgs)]);

    let good = JoinerParams {
        pskd: "J01NME".to_owned(),
        ..Default::default()
    };
    let r = res.clone();
    c.joiner_start(good.clone(), Box::new(move |v| r.borrow_mut().push(v)));
    c.joiner_stop();
    run(&c);
    assert_eq!(res.borrow()[1], Err(OtError::Abort));

    let r = res.clone();
    c.joiner_start(good, Box::new(move |v| r.borrow_mut().push(v)));
    run(&c);
    assert_eq!(res.borrow()[2], Ok(()));
    assert_eq!(c.device_role(), DeviceRole::Child);
}

#[test]
fn factory_reset_rules() {
    let c = SimulatedController::new();
    c.attach(Some(params()), Box::new(|_| ()));
    run(&c);
    assert_eq!(c.erase_persistent_info(), Err(OtError::InvalidState));
    assert_eq!(c.set_mesh_local_prefix([0xfd; 8]), Err(OtError::InvalidState));
    c.detach().unwrap();
    c.erase_persistent_info().unwrap();
    assert_eq!(c.active_dataset_tlvs(), Err(OtError::NotFound));
    c.set_mesh_local_prefix([0xfd; 8]).unwrap();
}

#[test]
fn reset_notifies() {
    let c = SimulatedController::new();
    let resets = Rc::new(RefCell::new(0));
    let r = resets.clone();
    c.add_reset_handler(Box::new(move || *r.borrow_mut() += 1));
    c.attach(Some(params()), Box::new(|_| ()));
    run(&c);
    c.reset();
    assert_eq!(*resets.borrow(), 1);
    assert_eq!(c.device_role(), DeviceRole::Disabled);
}

#[test]
fn prefixes() {
    let c = SimulatedController::new();
    let prefix = Ip6Prefix {
        prefix: vec![0xfd, 0, 0, 0, 0, 0, 0, 1],
        length: 64,
    };
    c.add_on_mesh_prefix(OnMeshPrefix {
        prefix: prefix.clone(),
        stable: true,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(c.on_mesh_prefixes().unwrap().len(), 1);
    c.remove_on_mesh_prefix(prefix.clone()).unwrap();
    assert_eq!(c.remove_on_mesh_prefix(prefix), Err(OtError::NotFound));
    let bad = Ip6Prefix {
        prefix: vec![0; 17],
        length: 64,
    };
    assert_eq!(c.remove_external_route(bad), Err(OtError::InvalidArgs));
}

#[test]
fn scans() {
    let c = SimulatedController::new();
    let found = Rc::new(RefCell::new(None));
    let f = found.clone();
    c.scan(Box::new(move |r| *f.borrow_mut() = Some(r.unwrap().len())));
    let energy = Rc::new(RefCell::new(None));
    let e = energy.clone();
    c.energy_scan(100, Box::new(move |r| *e.borrow_mut() = Some(r.unwrap().len())));
    run(&c);
    assert_eq!(*found.borrow(), Some(1));
    assert_eq!(*energy.borrow(), Some(16));
}

#[test]
fn border_agent_settings() {
    let c = SimulatedController::new();
    assert_eq!(c.permit_unsecure_join(0, 10), Err(OtError::InvalidArgs));
    c.permit_unsecure_join(49191, 60).unwrap();
    assert_eq!(c.unsecure_join(), Some((49191, 60)));
    let mut txt = std::collections::BTreeMap::new();
    txt.insert("vn".to_owned(), b"Vendor".to_vec());
    c.update_meshcop_txt(txt.clone()).unwrap();
    assert_eq!(c.meshcop_txt(), txt);
    c.set_legacy_ula_prefix([0xfd, 1, 2, 3, 4, 5, 6, 7]).unwrap();
    assert_eq!(c.legacy_ula_prefix(), [0xfd, 1, 2, 3, 4, 5, 6, 7]);
}
