use super::*;

fn decode_all(bytes: &[u8]) -> (Vec<Message>, FrameDecoder, Reassembler) {
    let mut decoder = FrameDecoder::new();
    let mut reassembler = Reassembler::new();
    let mut messages = Vec::new();
    for frame in decoder.push(bytes) {
        if let Some(message) = reassembler.push(frame) {
            messages.push(message);
        }
    }
    (messages, decoder, reassembler)
}

#[test]
fn crc8_is_xor_of_cmd_length_and_payload() {
    assert_eq!(crc8(0xA1, 0, &[]), 0xA1);
    assert_eq!(crc8(0xA1, 0x0203, &[0x00, 0x01, 0x10]), 0xA1 ^ 0x02 ^ 0x03 ^ 0x01 ^ 0x10);
}

#[test]
fn crc32_matches_reference_check_value() {
    assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    assert_eq!(crc32(&[]), 0);
}

#[test]
fn single_frame_layout_matches_wire_format() {
    let frames = encode_frames(0xA1, &[0x10, 0x20, 0x30]).unwrap();
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(&frame[..2], &MAGIC);
    assert_eq!(frame[2], 0xA1);
    // len counts the chunk sub-header plus the data.
    assert_eq!(u16::from_be_bytes([frame[3], frame[4]]), 5);
    assert_eq!(frame[5], 0);
    assert_eq!(frame[6], 1);
    assert_eq!(&frame[7..10], &[0x10, 0x20, 0x30]);
    assert_eq!(frame[10], crc8(0xA1, 5, &frame[5..10]));
    assert_eq!(frame.len(), 11);
}

#[test]
fn empty_payload_still_sends_one_frame() {
    let frames = encode_frames(0xA2, &[]).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].len(), FRAME_HEADER_LEN + CHUNK_HEADER_LEN + 1);
    let (messages, _, _) = decode_all(&frames[0]);
    assert_eq!(
        messages,
        vec![Message {
            cmd: 0xA2,
            payload: Vec::new()
        }]
    );
}

#[test]
fn one_second_window_splits_into_63_chunks() {
    let samples: Vec<i16> = (0..16_000).map(|i| (i % 2000) as i16 - 1000).collect();
    let payload = audio_to_bytes(&samples);
    let frames = encode_frames(0xA1, &payload).unwrap();
    assert_eq!(frames.len(), 63);
    for (index, frame) in frames.iter().enumerate() {
        assert_eq!(frame[5] as usize, index);
        assert_eq!(frame[6], 63);
    }
    let last_len = u16::from_be_bytes([frames[62][3], frames[62][4]]) as usize;
    assert_eq!(last_len - CHUNK_HEADER_LEN, 32_000 - 62 * MAX_CHUNK_DATA);

    let stream: Vec<u8> = frames.concat();
    let (messages, decoder, reassembler) = decode_all(&stream);
    assert_eq!(messages.len(), 1);
    assert_eq!(decoder.crc_errors(), 0);
    assert_eq!(reassembler.dropped(), 0);
    assert_eq!(bytes_to_audio(&messages[0].payload).unwrap(), samples);
}

#[test]
fn oversized_payload_is_rejected() {
    let payload = vec![0u8; MAX_CHUNKS * MAX_CHUNK_DATA + 1];
    assert!(encode_frames(0xA1, &payload).is_err());
    let exact = vec![0u8; MAX_CHUNKS * MAX_CHUNK_DATA];
    assert_eq!(encode_frames(0xA1, &exact).unwrap().len(), MAX_CHUNKS);
}

#[test]
fn decoder_resyncs_after_garbage_and_corruption() {
    let good = encode_frames(0xA2, &[1, 2, 3, 4]).unwrap().concat();
    let mut corrupted = good.clone();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xFF;

    let mut stream = vec![0x00, 0xAB, 0x12, 0xCD];
    stream.extend_from_slice(&corrupted);
    stream.extend_from_slice(&good);

    let (messages, decoder, _) = decode_all(&stream);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].payload, vec![1, 2, 3, 4]);
    assert_eq!(decoder.crc_errors(), 1);
    assert!(decoder.skipped_bytes() > 0);
}

#[test]
fn decoder_handles_byte_at_a_time_input() {
    let stream = encode_frames(0xA3, &[9; 700]).unwrap().concat();
    let mut decoder = FrameDecoder::new();
    let mut reassembler = Reassembler::new();
    let mut messages = Vec::new();
    for byte in stream {
        for frame in decoder.push(&[byte]) {
            messages.extend(reassembler.push(frame));
        }
    }
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].payload.len(), 700);
}

#[test]
fn missing_chunk_drops_partial_message() {
    let frames = encode_frames(0xA1, &[7; 1500]).unwrap();
    assert_eq!(frames.len(), 3);
    let mut stream = frames[0].clone();
    stream.extend_from_slice(&frames[2]);
    stream.extend(encode_frames(0xA2, &[1]).unwrap().concat());

    let (messages, _, reassembler) = decode_all(&stream);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].cmd, 0xA2);
    assert_eq!(reassembler.dropped(), 1);
}

#[test]
fn interleaved_commands_reassemble_independently() {
    let audio = encode_frames(0xA1, &[5; 1024]).unwrap();
    let scores = encode_frames(0xA2, &[6; 8]).unwrap().concat();
    let mut stream = audio[0].clone();
    stream.extend_from_slice(&scores);
    stream.extend_from_slice(&audio[1]);

    let (messages, _, reassembler) = decode_all(&stream);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].cmd, 0xA2);
    assert_eq!(messages[1].cmd, 0xA1);
    assert_eq!(messages[1].payload.len(), 1024);
    assert_eq!(reassembler.dropped(), 0);
}

#[test]
fn score_report_layout() {
    let report = ScoreReport {
        sample_count: 16_000,
        scores: vec![0.25, 0.75],
    };
    let bytes = report.encode();
    assert_eq!(&bytes[..4], &16_000u32.to_le_bytes());
    assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
    assert_eq!(&bytes[8..12], &0.25f32.to_le_bytes());
    assert_eq!(ScoreReport::decode(&bytes).unwrap(), report);
    assert!(ScoreReport::decode(&bytes[..10]).is_err());
}

#[test]
fn audio_bytes_are_little_endian() {
    assert_eq!(audio_to_bytes(&[0x0102, -1]), vec![0x02, 0x01, 0xFF, 0xFF]);
    assert!(bytes_to_audio(&[1, 2, 3]).is_err());
}

#[test]
fn packet_writer_counts_frames() {
    let mut writer = PacketWriter::new(Vec::new());
    writer.send(0xA1, &[0; 600]).unwrap();
    writer.send(0xA2, &[]).unwrap();
    assert_eq!(writer.frames_sent(), 3);
    let (messages, _, _) = decode_all(writer.get_ref());
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].payload.len(), 600);
}
