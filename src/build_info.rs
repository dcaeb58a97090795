// 빌드 시점에 build.rs가 생성하는 상수
include!(concat!(env!("OUT_DIR"), "/build_info.rs"));
