#![no_main]

use libfuzzer_sys::fuzz_target;

use httpstash::codec::{decode_request, encode_request};

fuzz_target!(|data: &[u8]| {
    let Ok(request) = decode_request(data) else {
        return;
    };

    // Anything that decodes has an absolute URL and must re-encode.
    let encoded = encode_request(&request).expect("decoded request re-encodes");
    let again = decode_request(&encoded).expect("re-encoded request decodes");
    assert_eq!(request.method(), again.method());
    assert_eq!(request.uri(), again.uri());
    assert_eq!(request.headers().len(), again.headers().len());
});
