#![no_main]

use libfuzzer_sys::fuzz_target;

use httpstash::codec::{decode_response_header, encode_response_header};

fuzz_target!(|data: &[u8]| {
    let Ok((status, headers)) = decode_response_header(data) else {
        return;
    };

    let encoded = encode_response_header(status, &headers);
    let (again_status, again_headers) =
        decode_response_header(&encoded).expect("re-encoded header decodes");
    assert_eq!(status, again_status);
    assert_eq!(headers.len(), again_headers.len());
});
