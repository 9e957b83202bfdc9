mod frame_integration;
