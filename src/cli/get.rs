
use {
    crate::{
        agent::system_bus_address,
        cli::{GetArgs, GlobalArgs, install_logger},
        dbus::{DbusError, DbusSocket, DynamicType, Variant},
        thread::names,
        utils::{errorfmt::ErrorFmt, hex::bytes_to_hex},
    },
    std::fmt::Write,
};

pub fn main(global: GlobalArgs, args: GetArgs) {
    install_logger(&global);
    match get(&args) {
        Ok(v) => println!("{}", format_variant(&v)),
        Err(e) => fatal!("Could not read {}: {}", args.property, ErrorFmt(e)),
    }
}

fn get(args: &GetArgs) -> Result<Variant, DbusError> {
    let path = match &args.bus_address {
        Some(p) => p.clone(),
        None => system_bus_address(),
    };
    let socket = DbusSocket::connect(&path, "System bus", args.timeout)?;
    socket.get_property(
        &names::bus_name(&args.interface),
        &names::object_path(&args.interface),
        names::INTERFACE,
        &args.property,
        args.timeout,
    )
}

fn format_variant(v: &Variant) -> String {
    let mut s = String::new();
    write_variant(&mut s, v);
    s
}

fn write_variant(s: &mut String, v: &Variant) {
    let _ = match v {
        Variant::U8(v) => write!(s, "{}", v),
        Variant::Bool(v) => write!(s, "{}", v),
        Variant::I16(v) => write!(s, "{}", v),
        Variant::U16(v) => write!(s, "{}", v),
        Variant::I32(v) => write!(s, "{}", v),
        Variant::U32(v) => write!(s, "{}", v),
        Variant::I64(v) => write!(s, "{}", v),
        Variant::U64(v) => write!(s, "{}", v),
        Variant::F64(v) => write!(s, "{}", v),
        Variant::String(v) => write!(s, "{:?}", v),
        Variant::ObjectPath(v) => write!(s, "{}", &**v),
        Variant::Signature(v) => write!(s, "{}", &**v),
        Variant::Variant(v) => {
            write_variant(s, v);
            Ok(())
        }
        Variant::Array(DynamicType::U8, els) => {
            let bytes: Vec<u8> = els
                .iter()
                .filter_map(|e| match e {
                    Variant::U8(b) => Some(*b),
                    _ => None,
                })
                .collect();
            write!(s, "0x{}", bytes_to_hex(&bytes))
        }
        Variant::Array(_, els) => {
            write_list(s, '[', ']', els);
            Ok(())
        }
        Variant::DictEntry(k, v) => {
            write_variant(s, k);
            s.push_str(": ");
            write_variant(s, v);
            Ok(())
        }
        Variant::Struct(fields) => {
            write_list(s, '(', ')', fields);
            Ok(())
        }
    };
}

fn write_list(s: &mut String, open: char, close: char, els: &[Variant]) {
    s.push(open);
    for (i, el) in els.iter().enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        write_variant(s, el);
    }
    s.push(close);
}
