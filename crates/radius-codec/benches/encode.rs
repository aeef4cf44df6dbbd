use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use radius_codec::{
    encode_pair, AttrFlags, Avp, AvpList, Code, Dictionary, Encrypt, PacketCtx, Value, ValueKind,
    VendorFormat,
};

fn build_list(num_attributes: usize) -> AvpList {
    let mut dict = Dictionary::new();
    let user_name = dict
        .define_attribute("User-Name", 1, ValueKind::String, AttrFlags::default())
        .unwrap();
    let user_password = dict
        .define_attribute(
            "User-Password",
            2,
            ValueKind::String,
            AttrFlags {
                encrypt: Encrypt::UserPassword,
                ..AttrFlags::default()
            },
        )
        .unwrap();
    let reply_message = dict
        .define_attribute("Reply-Message", 18, ValueKind::String, AttrFlags::default())
        .unwrap();
    dict.define_vendor("Cisco", 9, VendorFormat::RFC).unwrap();
    let avpair = dict
        .define_vendor_attribute(9, "Cisco-AVPair", 1, ValueKind::String, AttrFlags::default())
        .unwrap();

    let mut list = AvpList::new();
    list.push(Avp::new(user_name, Value::String("testuser".into())).unwrap());
    list.push(Avp::new(user_password, Value::String("testpassword".into())).unwrap());
    list.push(Avp::new(avpair, Value::String("shell:priv-lvl=15".into())).unwrap());
    for i in 0..num_attributes {
        list.push(Avp::new(reply_message.clone(), Value::String(format!("attribute_{}", i))).unwrap());
    }
    list
}

fn bench_encode_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_pair");
    let packet = PacketCtx::new(Code::AccessRequest, [0x5a; 16]);

    for num_attrs in [0usize, 5, 10, 20].iter() {
        let list = build_list(*num_attrs);
        group.bench_with_input(
            BenchmarkId::from_parameter(num_attrs),
            num_attrs,
            |b, _| {
                let mut out = [0u8; 4096];
                b.iter(|| {
                    let mut used = 0;
                    let mut cursor = list.cursor();
                    while cursor.is_some() {
                        used += encode_pair(
                            &mut out[used..],
                            &packet,
                            None,
                            "testing123",
                            &mut cursor,
                        )
                        .expect("encode failed");
                    }
                    black_box(used)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_encode_pair);
criterion_main!(benches);
