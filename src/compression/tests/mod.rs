mod predictor_tests;
